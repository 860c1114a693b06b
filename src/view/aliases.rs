//! Table of every command token krill understands, built-in or configured.

use crate::config::resolve_alias;
use crate::model::{ResourceKind, RowData, TableData};
use chrono::Local;
use std::collections::HashMap;

const HEADERS: [&str; 3] = ["RESOURCE", "COMMAND", "APIGROUP"];

/// One row per resource kind. The COMMAND cell lists the built-in tokens
/// followed by the user aliases that resolve to the kind.
pub fn alias_table(aliases: &HashMap<String, String>) -> TableData {
    let rows = ResourceKind::ALL
        .into_iter()
        .map(|kind| {
            let mut commands = kind
                .tokens()
                .iter()
                .map(|token| token.to_string())
                .collect::<Vec<_>>();
            let mut configured = aliases
                .keys()
                .filter(|alias| !commands.contains(alias) && target(aliases, alias) == Some(kind))
                .cloned()
                .collect::<Vec<_>>();
            configured.sort();
            commands.extend(configured);

            let detail = format!(
                "resource: {}\napiGroup: {}\ncommands:\n{}",
                kind.title(),
                kind.api_group(),
                commands
                    .iter()
                    .map(|command| format!("  - {command}\n"))
                    .collect::<String>()
            );
            RowData {
                name: kind.command().to_string(),
                namespace: None,
                columns: vec![
                    kind.title().to_string(),
                    commands.join(","),
                    kind.api_group().to_string(),
                ],
                detail,
            }
        })
        .collect();

    let mut table = TableData::default();
    table.set_rows(
        HEADERS.iter().map(|header| header.to_string()).collect(),
        rows,
        Local::now(),
    );
    table
}

fn target(aliases: &HashMap<String, String>, alias: &str) -> Option<ResourceKind> {
    resolve_alias(aliases, alias)
        .split_whitespace()
        .next()
        .and_then(ResourceKind::from_token)
}

#[cfg(test)]
mod tests {
    use super::alias_table;
    use crate::model::ResourceKind;
    use std::collections::HashMap;

    #[test]
    fn lists_every_kind_in_three_columns() {
        let table = alias_table(&HashMap::new());
        assert_eq!(table.headers, vec!["RESOURCE", "COMMAND", "APIGROUP"]);
        assert_eq!(table.rows.len(), ResourceKind::ALL.len());
        assert!(table.rows.iter().all(|row| row.columns.len() == 3));
        assert!(table.last_refreshed.is_some());

        let deploy = &table.rows[1];
        assert_eq!(deploy.name, "deploy");
        assert_eq!(deploy.columns[0], "Deployments");
        assert_eq!(deploy.columns[1], "deploy,dp,deployment,deployments");
        assert_eq!(deploy.columns[2], "apps/v1");
    }

    #[test]
    fn configured_aliases_join_their_target_kind() {
        let aliases = HashMap::from([
            ("web".to_string(), "deploy prod".to_string()),
            ("w".to_string(), "web".to_string()),
            ("dp".to_string(), "deploy".to_string()),
            ("nope".to_string(), "crd".to_string()),
        ]);
        let table = alias_table(&aliases);

        let deploy = &table.rows[1];
        assert_eq!(deploy.columns[1], "deploy,dp,deployment,deployments,w,web");
        assert!(deploy.detail.contains("  - web\n"));
        assert!(table.rows.iter().all(|row| !row.columns[1].contains("nope")));
    }
}
