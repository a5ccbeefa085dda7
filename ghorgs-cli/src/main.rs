use clap::{Args, Parser, Subcommand};
use ghorgs::config::{parse_config, ApiConfig, Config, CONFIG_FILE};
use ghorgs::members::{user_schema, USERS_CSV_HEADER};
use ghorgs::{append_csv, fetch_members, FlatFile, HttpFetcher, Table, UsersResponse};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

/// Organization membership reports from GitHub GraphQL responses
#[derive(Parser)]
#[command(name = "ghorgs", version, about)]
struct Cli {
    /// Config file (default: ghorgs.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch all members of the organization and print them as a report
    Fetch {
        /// Organization login (default: organization from the config)
        #[arg(long)]
        org: Option<String>,
        /// Also append every fetched member to the users CSV
        #[arg(long)]
        append: bool,
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Print members as a tab-separated report
    Users {
        /// Response pages of the membersWithRole query
        #[arg(required = true)]
        pages: Vec<PathBuf>,
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Write members to a tab-separated file, replacing its contents
    Export {
        #[arg(required = true)]
        pages: Vec<PathBuf>,
        /// Output file
        #[arg(long)]
        out: PathBuf,
    },

    /// Append members to the users CSV
    Append {
        #[arg(required = true)]
        pages: Vec<PathBuf>,
        /// Target file (default: users_csv from the config)
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

/// Applied in this order: filter, any, lt, gt, sort, first/last.
#[derive(Args, Debug, Default)]
struct QueryArgs {
    /// Keep records whose field equals a value (e.g. --filter Role=ADMIN)
    #[arg(long = "filter", value_parser = parse_key_value)]
    filters: Vec<(String, String)>,

    /// Keep records whose field is one of several values (e.g. --any Role=ADMIN,MEMBER)
    #[arg(long, value_parser = parse_key_values)]
    any: Option<(String, Vec<String>)>,

    /// Keep records whose field sorts before a value
    #[arg(long, value_parser = parse_key_value)]
    lt: Option<(String, String)>,

    /// Keep records whose field sorts after a value
    #[arg(long, value_parser = parse_key_value)]
    gt: Option<(String, String)>,

    /// Sort ascending by a field (default: report.sort from the config)
    #[arg(long)]
    sort: Option<String>,

    /// Keep only the first N records
    #[arg(long, conflicts_with = "last")]
    first: Option<usize>,

    /// Keep only the last N records
    #[arg(long)]
    last: Option<usize>,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("Invalid field=value pair: no '=' found in '{s}'"))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn parse_key_values(s: &str) -> Result<(String, Vec<String>), String> {
    let (field, values) = parse_key_value(s)?;
    let values = values.split(',').map(str::to_string).collect();
    Ok((field, values))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Fetch { org, append, query } => {
            let organization = org
                .or_else(|| config.as_ref().map(|c| c.organization.clone()))
                .ok_or("No organization: pass --org or set organization in the config")?;
            let api = config.as_ref().map(|c| c.api.clone()).unwrap_or_default();
            let table = fetch_all(&api, &organization)?;
            if append {
                let target = users_csv(None, config.as_ref());
                append_csv(&target, &USERS_CSV_HEADER, &table)?;
                log::info!("Appended {} members to {}", table.len(), target.display());
            }
            print_report(table, &query, config.as_ref())?;
        }

        Command::Users { pages, query } => {
            let table = load_pages(&pages)?;
            print_report(table, &query, config.as_ref())?;
        }

        Command::Export { pages, out } => {
            let table = load_pages(&pages)?;
            let file = FlatFile::from_table(out, &table)?;
            file.flush(&USERS_CSV_HEADER)?;
            log::info!("Exported {} members to {}", table.len(), file.path().display());
        }

        Command::Append { pages, csv } => {
            let table = load_pages(&pages)?;
            let target = users_csv(csv, config.as_ref());
            append_csv(&target, &USERS_CSV_HEADER, &table)?;
            log::info!("Appended {} members to {}", table.len(), target.display());
        }
    }

    Ok(())
}

fn load_config(explicit: Option<&Path>) -> ghorgs::Result<Option<Config>> {
    match explicit {
        Some(path) => parse_config(path).map(Some),
        None => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                parse_config(path).map(Some)
            } else {
                Ok(None)
            }
        }
    }
}

fn users_csv(explicit: Option<PathBuf>, config: Option<&Config>) -> PathBuf {
    explicit
        .or_else(|| config.map(|c| c.users_csv.clone()))
        .unwrap_or_else(|| PathBuf::from("users.csv"))
}

fn fetch_all(api: &ApiConfig, organization: &str) -> ghorgs::Result<Table> {
    let fetcher = HttpFetcher::new(api.url.clone(), api.token()?, api.timeout());
    fetch_members(&fetcher, organization)
}

fn print_report(
    table: Table,
    query: &QueryArgs,
    config: Option<&Config>,
) -> ghorgs::Result<()> {
    let default_sort = config.and_then(|c| c.report.sort.as_deref());
    let report = apply_query(table, query, default_sort)?;
    if !report.is_empty() {
        println!("{report}");
    }
    Ok(())
}

fn load_pages(pages: &[PathBuf]) -> Result<Table, Box<dyn std::error::Error>> {
    let mut table = Table::with_schema(Arc::new(user_schema()));
    for page in pages {
        let bytes = std::fs::read(page)
            .map_err(|e| format!("Failed to read response page '{}': {e}", page.display()))?;
        UsersResponse::from_json(&bytes)?.append_to_table(&mut table)?;
    }
    Ok(table)
}

fn apply_query(
    mut table: Table,
    query: &QueryArgs,
    default_sort: Option<&str>,
) -> ghorgs::Result<Table> {
    for (field, value) in &query.filters {
        table = table.find_all_by_field(field, value)?;
    }
    if let Some((field, values)) = &query.any {
        // Missing values are logged by the table; keep whatever did match.
        table = table
            .find_all_by_field_values(field, values.as_slice())?
            .into_table();
    }
    if let Some((field, value)) = &query.lt {
        table = table.less_than_by_field(field, value)?;
    }
    if let Some((field, value)) = &query.gt {
        table = table.greater_than_by_field(field, value)?;
    }
    if let Some(field) = query.sort.as_deref().or(default_sort) {
        table = table.sort_by_field(field)?;
    }
    if let Some(n) = query.first {
        table = table.first(n)?;
    }
    if let Some(n) = query.last {
        table = table.last(n)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghorgs::{GhorgsError, Schema};
    use tempfile::TempDir;

    const PAGE: &str = r#"{"data": {"organization": {"membersWithRole": {
        "totalCount": 2,
        "pageInfo": {"hasNextPage": false, "endCursor": null},
        "edges": [
            {"hasTwoFactorEnabled": true, "role": "ADMIN", "node": {
                "id": "u1", "login": "alice", "name": "Alice", "url": "https://github.com/alice",
                "updatedAt": "2019-05-01T10:00:00Z"}},
            {"hasTwoFactorEnabled": false, "role": "MEMBER", "node": {
                "id": "u2", "login": "bob", "url": "https://github.com/bob",
                "updatedAt": "2019-04-01T08:30:00Z"}}
        ]}}}}"#;

    /// A temp dir holding a config file and one response page.
    fn workspace() -> (TempDir, PathBuf, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let config = tmp.path().join("ghorgs.yaml");
        let users_csv = tmp.path().join("users.csv");
        std::fs::write(
            &config,
            format!("organization: acme\nusers_csv: {}\n", users_csv.display()),
        )
        .unwrap();
        let page = tmp.path().join("page1.json");
        std::fs::write(&page, PAGE).unwrap();
        (tmp, config, page)
    }

    fn run_args(args: &[&str]) -> Result<(), Box<dyn std::error::Error>> {
        let cli = Cli::try_parse_from(std::iter::once("ghorgs").chain(args.iter().copied()))?;
        run(cli)
    }

    fn members() -> Table {
        let mut table = Table::new(Schema::new(["Login", "Role"]));
        for (key, login, role) in [
            ("u3", "carol", "MEMBER"),
            ("u1", "alice", "ADMIN"),
            ("u2", "bob", "ADMIN"),
        ] {
            table.insert(key, vec![login.into(), role.into()]).unwrap();
        }
        table
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("Role=ADMIN").unwrap(),
            ("Role".to_string(), "ADMIN".to_string())
        );
        assert_eq!(
            parse_key_value("Bio=a=b").unwrap(),
            ("Bio".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("Role").is_err());
    }

    #[test]
    fn test_parse_key_values() {
        let (field, values) = parse_key_values("Role=ADMIN,MEMBER").unwrap();
        assert_eq!(field, "Role");
        assert_eq!(values, vec!["ADMIN", "MEMBER"]);
    }

    #[test]
    fn test_apply_query_chain() {
        let query = QueryArgs {
            filters: vec![("Role".into(), "ADMIN".into())],
            sort: Some("Login".into()),
            first: Some(1),
            ..QueryArgs::default()
        };
        let report = apply_query(members(), &query, None).unwrap();
        assert_eq!(report.keys(), ["u1"]);
    }

    #[test]
    fn test_apply_query_default_sort() {
        let report = apply_query(members(), &QueryArgs::default(), Some("Id")).unwrap();
        assert_eq!(report.keys(), ["u1", "u2", "u3"]);
    }

    #[test]
    fn test_apply_query_keeps_partial_match() {
        let query = QueryArgs {
            any: Some(("Role".into(), vec!["ADMIN".into(), "OWNER".into()])),
            ..QueryArgs::default()
        };
        let report = apply_query(members(), &query, None).unwrap();
        assert_eq!(report.keys(), ["u1", "u2"]);
    }

    #[test]
    fn test_load_pages() {
        let (_tmp, _config, page) = workspace();
        let table = load_pages(&[page.clone(), page]).unwrap();
        assert_eq!(table.keys(), ["u1", "u2"]);
        assert_eq!(table.row("u1").unwrap()[2], "ADMIN");
    }

    #[test]
    fn test_load_pages_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = load_pages(&[tmp.path().join("nope.json")]).unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }

    #[test]
    fn test_run_users() {
        let (_tmp, config, page) = workspace();
        run_args(&[
            "--config",
            config.to_str().unwrap(),
            "users",
            page.to_str().unwrap(),
            "--filter",
            "Role=ADMIN",
        ])
        .unwrap();
    }

    #[test]
    fn test_run_users_unknown_field() {
        let (_tmp, config, page) = workspace();
        let err = run_args(&[
            "--config",
            config.to_str().unwrap(),
            "users",
            page.to_str().unwrap(),
            "--sort",
            "Nope",
        ])
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid search field: Nope");
    }

    #[test]
    fn test_run_export() {
        let (tmp, config, page) = workspace();
        let out = tmp.path().join("members.tsv");
        run_args(&[
            "--config",
            config.to_str().unwrap(),
            "export",
            page.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
        ])
        .unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], USERS_CSV_HEADER.join("\t"));
        assert!(lines[2].starts_with("u2\tbob\t\tMEMBER\tfalse\t"));
    }

    #[test]
    fn test_run_append_uses_config_target() {
        let (tmp, config, page) = workspace();
        for _ in 0..2 {
            run_args(&[
                "--config",
                config.to_str().unwrap(),
                "append",
                page.to_str().unwrap(),
            ])
            .unwrap();
        }

        let written = std::fs::read_to_string(tmp.path().join("users.csv")).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], USERS_CSV_HEADER.join("\t"));
        assert!(lines[1].contains("\t2019-05-01 10:00:00 +0000 UTC\t"));
    }

    #[test]
    fn test_run_append_explicit_target() {
        let (tmp, config, page) = workspace();
        let target = tmp.path().join("other.csv");
        run_args(&[
            "--config",
            config.to_str().unwrap(),
            "append",
            page.to_str().unwrap(),
            "--csv",
            target.to_str().unwrap(),
        ])
        .unwrap();
        assert!(target.exists());
        assert!(!tmp.path().join("users.csv").exists());
    }

    #[test]
    fn test_fetch_requires_token() {
        let (tmp, _config, _page) = workspace();
        let config = tmp.path().join("fetch.yaml");
        std::fs::write(
            &config,
            "organization: acme\napi:\n  token_env: GHORGS_TEST_TOKEN_THAT_IS_NEVER_SET\n",
        )
        .unwrap();
        let err = run_args(&["--config", config.to_str().unwrap(), "fetch"]).unwrap_err();
        assert!(err.to_string().contains("GHORGS_TEST_TOKEN_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn test_apply_query_reports_errors() {
        let query = QueryArgs {
            last: Some(10),
            ..QueryArgs::default()
        };
        assert!(matches!(
            apply_query(members(), &query, None),
            Err(GhorgsError::OutOfRange { .. })
        ));
    }
}
