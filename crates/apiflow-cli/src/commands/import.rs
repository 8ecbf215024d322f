use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use apiflow_core::Id;
use apiflow_events::EventPublisher;
use apiflow_import::ImportCoordinator;
use apiflow_import_types::{DomainMapping, ImportRequest, MissingData};
use clap::Args;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{DatabaseArgs, ImportConfigArgs};

#[derive(Args)]
pub struct ImportCommand {
    /// File to import, or an http(s) URL to fetch it from
    pub source: String,

    /// Workspace to import into
    #[arg(long, env = "APIFLOW_WORKSPACE_ID")]
    pub workspace: String,

    /// Import name; defaults to the file or URL name
    #[arg(long)]
    pub name: Option<String>,

    /// Replace a domain with a variable, e.g. api.example.com=API_HOST
    #[arg(long = "domain", value_name = "DOMAIN=VARIABLE", value_parser = parse_mapping)]
    pub domains: Vec<DomainMapping>,

    /// Only report the domains found, store nothing
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub import: ImportConfigArgs,
}

impl ImportCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run())
    }

    async fn run(self) -> anyhow::Result<()> {
        let workspace_id = Id::from_str(self.workspace.trim())
            .map_err(|e| anyhow::anyhow!("Invalid workspace id {}: {}", self.workspace, e))?;
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| default_name(&self.source));
        let request = self.load_request(workspace_id, name).await?;

        let db = self.database.connect().await?;
        let coordinator =
            ImportCoordinator::new(db, self.import.config(), Arc::new(EventPublisher::new()))?;

        let cancel = CancellationToken::new();
        let on_ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Received Ctrl+C, cancelling import...");
                on_ctrl_c.cancel();
            }
        });

        let discovery = coordinator
            .import_with_cancel(request.clone(), cancel.clone())
            .await?;
        if discovery.domains.is_empty() {
            debug!("Payload references no API domains");
        } else {
            println!("{}", "Domains found:".bold());
            for domain in &discovery.domains {
                match self.domains.iter().find(|m| m.domain.eq_ignore_ascii_case(domain)) {
                    Some(mapping) => println!("  {} -> {{{{{}}}}}", domain, mapping.variable.cyan()),
                    None => println!("  {} {}", domain, "(kept as is)".dimmed()),
                }
            }
        }

        // YAML flows commit on the first call
        if discovery.missing_data != MissingData::Domain {
            print_stored(discovery.flow_id);
            return Ok(());
        }
        if self.dry_run {
            println!("{}", "Dry run: nothing stored".yellow());
            return Ok(());
        }

        let response = coordinator
            .import_with_cancel(request.with_domains(self.domains.clone()), cancel)
            .await?;
        print_stored(response.flow_id);
        Ok(())
    }

    async fn load_request(&self, workspace_id: Id, name: String) -> anyhow::Result<ImportRequest> {
        if is_remote(&self.source) {
            info!(url = %self.source, "Importing from URL");
            return Ok(ImportRequest::new(workspace_id, name, Vec::new()).with_text(self.source.clone()));
        }

        let data = tokio::fs::read(&self.source)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", self.source, e))?;
        info!(path = %self.source, bytes = data.len(), "Importing from file");
        Ok(ImportRequest::new(workspace_id, name, data))
    }
}

fn print_stored(flow_id: Option<Id>) {
    match flow_id {
        Some(id) => println!("{} flow {}", "Imported".bright_green(), id.to_string().bold()),
        None => println!("{} (no flow created)", "Imported".bright_green()),
    }
}

fn is_remote(source: &str) -> bool {
    url::Url::parse(source)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

fn default_name(source: &str) -> String {
    let candidate = if is_remote(source) {
        url::Url::parse(source)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(str::to_string))
                    .or_else(|| u.host_str().map(str::to_string))
            })
    } else {
        Path::new(source)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
    };
    candidate
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "import".to_string())
}

fn parse_mapping(value: &str) -> Result<DomainMapping, String> {
    let (domain, variable) = value
        .split_once('=')
        .ok_or_else(|| format!("expected DOMAIN=VARIABLE, got '{}'", value))?;
    let (domain, variable) = (domain.trim(), variable.trim());
    if domain.is_empty() || variable.is_empty() {
        return Err(format!("expected DOMAIN=VARIABLE, got '{}'", value));
    }
    Ok(DomainMapping::new(domain, variable))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mapping() {
        let mapping = parse_mapping("api.example.com=API_HOST").unwrap();
        assert_eq!(mapping.domain, "api.example.com");
        assert_eq!(mapping.variable, "API_HOST");
        assert!(mapping.enabled);

        assert!(parse_mapping("api.example.com").is_err());
        assert!(parse_mapping("=API_HOST").is_err());
    }

    #[test]
    fn test_default_name() {
        assert_eq!(default_name("recordings/checkout.har"), "checkout");
        assert_eq!(default_name("https://example.com/specs/petstore.json"), "petstore.json");
        assert_eq!(default_name("https://example.com/"), "example.com");
        assert_eq!(default_name(""), "import");
    }

    #[derive(clap::Parser)]
    struct TestCli {
        #[command(flatten)]
        import: ImportCommand,
    }

    #[tokio::test]
    async fn test_load_request_reads_files_and_keeps_urls() {
        use clap::Parser;
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"log":{"entries":[]}}"#).unwrap();
        let path = file.path().to_string_lossy().into_owned();
        let workspace_id = Id::new();

        let cli = TestCli::parse_from(["apiflow", &path, "--workspace", "w"]);
        let request = cli
            .import
            .load_request(workspace_id, "recording".to_string())
            .await
            .unwrap();
        assert_eq!(request.data, br#"{"log":{"entries":[]}}"#.to_vec());
        assert!(!request.has_domain_answers());

        let cli = TestCli::parse_from([
            "apiflow",
            "https://example.com/openapi.yaml",
            "--workspace",
            "w",
            "--domain",
            "example.com=HOST",
        ]);
        assert_eq!(cli.import.domains, vec![DomainMapping::new("example.com", "HOST")]);
        let request = cli
            .import
            .load_request(workspace_id, "spec".to_string())
            .await
            .unwrap();
        assert!(request.data.is_empty());
        assert_eq!(request.text_data, "https://example.com/openapi.yaml");
    }

    #[test]
    fn test_remote_sources() {
        assert!(is_remote("https://example.com/openapi.yaml"));
        assert!(!is_remote("ftp://example.com/openapi.yaml"));
        assert!(!is_remote("./openapi.yaml"));
    }
}
