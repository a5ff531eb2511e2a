use crate::cli::args::CliArgs;
use crate::output::OutputFormat;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(raw) = args.user.as_deref() {
        crate::utils::parse_user_id(raw).map_err(|e| format!("invalid --user '{raw}': {e}"))?;
    }
    if let Some(raw) = args.base_url.as_deref() {
        crate::utils::parse_base_url(raw)
            .map_err(|e| format!("invalid --base-url '{raw}': {e}"))?;
    }
    if let Some(raw) = args.format.as_deref() {
        if OutputFormat::parse(raw).is_none() {
            return Err(format!(
                "invalid --format '{raw}', expected cards, table, json or html"
            ));
        }
    }
    if let Some(raw) = args.header.as_deref() {
        if crate::utils::split_header(raw).is_none() {
            return Err(format!("invalid --header '{raw}', expected \"Key: Value\""));
        }
    }
    if let Some(name) = args.key_header.as_deref() {
        if name.trim().is_empty() {
            return Err("invalid --key-header, expected a header name".to_string());
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid --timeout, expected positive integer".to_string());
        }
    }
    Ok(())
}
