use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pagedrain",
    version,
    about = "fetch every page of a users API and render the records",
    long_about = "pagedrain walks a paginated users endpoint page by page and renders every record as cards, a table, JSON or an HTML report.\n\nExamples:\n  pagedrain\n  pagedrain --table\n  pagedrain --user 2\n  pagedrain -o users.html\n  pagedrain --config ~/.pagedrain/config.yml\n\nTip: Use --init-config to write a default config file."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        long = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'f',
        long = "format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format: cards, table, json or html."
    )]
    pub format: Option<String>,

    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write rendered output to a file instead of stdout."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'u',
        long = "user",
        value_name = "ID",
        help_heading = "View",
        help = "Show the detail view of a single user."
    )]
    pub user: Option<String>,

    #[arg(
        short = 't',
        long = "table",
        conflicts_with = "user",
        help_heading = "View",
        help = "Show every user as a table."
    )]
    pub table: bool,

    #[arg(
        short = 'b',
        long = "base-url",
        value_name = "URL",
        help_heading = "API",
        help = "API base URL (default https://reqres.in/api)."
    )]
    pub base_url: Option<String>,

    #[arg(
        short = 'k',
        long = "api-key",
        value_name = "KEY",
        help_heading = "API",
        help = "Static API key sent with every request."
    )]
    pub api_key: Option<String>,

    #[arg(
        long = "key-header",
        value_name = "NAME",
        help_heading = "API",
        help = "Header carrying the API key (default x-api-key)."
    )]
    pub key_header: Option<String>,

    #[arg(
        short = 'H',
        long = "header",
        value_name = "HEADER",
        help_heading = "API",
        help = "Extra request header (\"Key: Value\")."
    )]
    pub header: Option<String>,

    #[arg(
        long = "timeout",
        value_name = "SECS",
        help_heading = "HTTP",
        help = "Request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'p',
        long = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "HTTP proxy URL."
    )]
    pub proxy: Option<String>,

    #[arg(
        short = 'r',
        long = "rate",
        value_name = "RPS",
        help_heading = "HTTP",
        help = "Request rate limit (requests per second, 0 = unlimited)."
    )]
    pub rate: Option<u32>,

    #[arg(
        short = 'C',
        long = "config",
        value_name = "FILE",
        help_heading = "Config",
        help = "Path to config file (defaults to ~/.pagedrain/config.yml when present)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "init-config",
        help_heading = "Config",
        help = "Write a default config file and exit."
    )]
    pub init_config: bool,
}
