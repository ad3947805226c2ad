use crate::GlobalOptions;
use anyhow::Result;
use chrono::Local;
use smartcd::{HistoryStore, LoggedVisit};

pub fn run(limit: Option<usize>, json: bool, options: &GlobalOptions) -> Result<()> {
    let config = options.config()?;
    let store = HistoryStore::from_config(&config)?;
    let visits = store.read()?;
    let visits = tail(&visits, limit);

    if json {
        println!("{}", serde_json::to_string(visits)?);
        return Ok(());
    }

    for visit in visits {
        println!("{}", format_visit(visit));
    }
    Ok(())
}

fn tail(visits: &[LoggedVisit], limit: Option<usize>) -> &[LoggedVisit] {
    match limit {
        Some(n) if n < visits.len() => &visits[visits.len() - n..],
        _ => visits,
    }
}

fn format_visit(visit: &LoggedVisit) -> String {
    let when = visit
        .time()
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("{:<19}  {}", when, visit.path.display())
}
