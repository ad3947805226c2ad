use crate::GlobalOptions;
use anyhow::Result;
use smartcd::{ExtensionLifecycle, ScdConfig};
use smartcd_host::{Command, CommandRegistry, CommandTable, HostError};
use std::cell::RefCell;
use std::env;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

const HOST_NAME: &str = "scdsh";

const HELP: &str = "\
Commands:
  cd [DIR]        change directory (no DIR = home, - = previous)
  pushd [DIR]     push the current directory and change to DIR
                  (no DIR swaps the top two directories)
  popd            return to the directory on top of the stack
  dirs            show the directory stack
  pwd             print the current directory
  scd [OPTIONS] [PATTERN...]
                  smart change to a recently used directory
  enable          install scd and log visits from cd, pushd and popd
  disable         remove scd and stop logging
  help            show this message
  exit, quit      leave the shell

scd goes to a directory path that matches all patterns, preferring recent
or frequently visited directories from the history log. A selection menu
is shown when several paths match.

Special patterns:
  ^PAT      match at the path root, \"^/home\"
  PAT$      match paths ending with PAT, \"man$\"
  ./        match paths under the current directory
  PAT:      require PAT to span the tail, \"doc:\", \"re/doc:\"

Options are read by the scd matcher itself; common ones are
  -a, --add       add current or given directories to the index
  -p, --push      use pushd to change to the target directory
  --list          show matching directories and exit
  -v, --verbose   display directory rank in the selection menu
  -h, --help      display the matcher's full help
";

/// Directory bookkeeping shared by the shell's own primitives.
#[derive(Debug, Default)]
struct DirState {
    stack: Vec<PathBuf>,
    previous: Option<PathBuf>,
    home: Option<PathBuf>,
}

type SharedDirs = Rc<RefCell<DirState>>;

enum Flow {
    Continue,
    Exit,
}

struct Shell {
    table: CommandTable,
    lifecycle: ExtensionLifecycle,
    dirs: SharedDirs,
}

impl Shell {
    fn new(config: ScdConfig) -> Self {
        let dirs = Rc::new(RefCell::new(DirState {
            home: config.home_dir().ok().map(Path::to_path_buf),
            ..Default::default()
        }));
        let mut table = CommandTable::new(HOST_NAME);
        register_primitives(&mut table, &dirs);

        Self {
            table,
            lifecycle: ExtensionLifecycle::new(config),
            dirs,
        }
    }

    fn enable(&mut self) {
        if let Err(e) = self.lifecycle.activate(&mut self.table) {
            eprintln!("scd: {}", e);
        }
    }

    fn disable(&mut self) {
        self.lifecycle.deactivate(&mut self.table);
    }

    fn prompt(&self) -> String {
        let cwd = env::current_dir()
            .map(|p| abbreviate(&p, self.dirs.borrow().home.as_deref()))
            .unwrap_or_else(|_| "?".to_string());
        format!("{} $ ", cwd)
    }

    fn execute(&mut self, line: &str) -> Flow {
        let Some((name, arg)) = split_command(line) else {
            return Flow::Continue;
        };

        debug!(command = name, arg, "dispatch");
        match name {
            "exit" | "quit" => return Flow::Exit,
            "enable" => self.enable(),
            "disable" => self.disable(),
            "help" => print!("{}", HELP),
            _ => {
                if let Err(e) = self.table.dispatch(name, arg) {
                    eprintln!("{}: {}", name, e);
                }
            }
        }
        Flow::Continue
    }
}

pub fn run(no_activate: bool, options: &GlobalOptions) -> Result<()> {
    let mut shell = Shell::new(options.config()?);
    if !no_activate {
        shell.enable();
    }

    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut line = String::new();
    loop {
        if interactive {
            print!("{}", shell.prompt());
            io::stdout().flush()?;
        }
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if let Flow::Exit = shell.execute(&line) {
            break;
        }
    }

    shell.disable();
    Ok(())
}

/// Split an input line into command name and argument string. A leading
/// `%` is accepted and dropped; blank lines and comments yield `None`.
fn split_command(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    let line = line.strip_prefix('%').unwrap_or(line).trim_start();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((name, arg)) => Some((name, arg.trim())),
        None => Some((line, "")),
    }
}

// ── Primitives ───────────────────────────────────────────────────────

fn register_primitives(table: &mut CommandTable, dirs: &SharedDirs) {
    let state = dirs.clone();
    table.register(Command::new("cd", move |arg| {
        let mut dirs = state.borrow_mut();
        let target = resolve_target(&target_word(arg), &dirs)?;
        chdir(&mut dirs, &target)?;
        Ok(())
    }));

    let state = dirs.clone();
    table.register(Command::new("pushd", move |arg| {
        let mut dirs = state.borrow_mut();
        let word = target_word(arg);
        let target = if word.is_empty() {
            dirs.stack
                .last()
                .cloned()
                .ok_or_else(|| HostError::Usage("no other directory".into()))?
        } else {
            resolve_target(&word, &dirs)?
        };
        let from = chdir(&mut dirs, &target)?;
        if word.is_empty() {
            dirs.stack.pop();
        }
        dirs.stack.push(from);
        Ok(())
    }));

    let state = dirs.clone();
    table.register(Command::new("popd", move |_| {
        let mut dirs = state.borrow_mut();
        let target = dirs.stack.last().cloned().ok_or(HostError::DirStackEmpty)?;
        chdir(&mut dirs, &target)?;
        dirs.stack.pop();
        Ok(())
    }));

    let state = dirs.clone();
    table.register(Command::new("dirs", move |_| {
        let dirs = state.borrow();
        let home = dirs.home.as_deref();
        let mut entries = vec![abbreviate(&env::current_dir()?, home)];
        entries.extend(dirs.stack.iter().rev().map(|p| abbreviate(p, home)));
        println!("{}", entries.join(" "));
        Ok(())
    }));

    table.register(Command::new("pwd", |_| {
        println!("{}", env::current_dir()?.display());
        Ok(())
    }));
}

/// Change the process directory, returning the one we left.
fn chdir(dirs: &mut DirState, target: &Path) -> smartcd_host::Result<PathBuf> {
    let from = env::current_dir()?;
    env::set_current_dir(target).map_err(|e| HostError::from_chdir(target, e))?;
    dirs.previous = Some(from.clone());
    Ok(from)
}

/// The directory word of a primitive's argument: shell-unquoted when it
/// forms one word, otherwise the trimmed text as typed.
fn target_word(arg: &str) -> String {
    match shlex::split(arg) {
        Some(mut words) if words.len() == 1 => words.remove(0),
        _ => arg.trim().to_string(),
    }
}

fn resolve_target(word: &str, dirs: &DirState) -> smartcd_host::Result<PathBuf> {
    match word {
        "" => dirs
            .home
            .clone()
            .ok_or_else(|| HostError::Usage("HOME not set".into())),
        "-" => dirs
            .previous
            .clone()
            .ok_or_else(|| HostError::Usage("no previous directory".into())),
        _ => {
            let home = || dirs.home.as_deref().and_then(Path::to_str);
            Ok(PathBuf::from(shellexpand::tilde_with_context(word, home).as_ref()))
        }
    }
}

fn abbreviate(path: &Path, home: Option<&Path>) -> String {
    match home.and_then(|h| path.strip_prefix(h).ok()) {
        Some(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Some(rest) => format!("~/{}", rest.display()),
        None => path.display().to_string(),
    }
}
