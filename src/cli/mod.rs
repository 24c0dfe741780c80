//! FM-011: CLI subcommands: init, validate, compile, params, resolve, load, query, action.

use crate::core::config::{RuntimeConfig, CONFIG_FILE};
use crate::core::params::extract_parameters;
use crate::core::parser::{self, ParseOptions};
use crate::core::resolver::{self, MappingTable};
use crate::core::types::FeatureDefinition;
use crate::error::{Error, LookupKind};
use crate::gateway::TracingHooks;
use crate::runtime::FeatureContext;
use crate::transport::parse_params;
use clap::{ArgGroup, Subcommand, ValueEnum};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new forma project (forma.yaml + sample feature spec)
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Compile a feature spec and report every problem found
    Validate {
        /// Path to the feature spec
        #[arg(short, long, default_value = "feature.xml")]
        file: PathBuf,

        /// Fail on the first malformed attribute or duplicate id
        #[arg(long)]
        strict: bool,
    },

    /// Compile a feature spec and print the definition
    Compile {
        /// Path to the feature spec
        #[arg(short, long, default_value = "feature.xml")]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Fail on the first malformed attribute or duplicate id
        #[arg(long)]
        strict: bool,
    },

    /// List the named parameters in a query text
    Params {
        /// Query text, e.g. "SELECT * FROM t WHERE id = :id"
        text: String,
    },

    /// Print a form or data table with mappings applied
    #[command(group(ArgGroup::new("target").required(true).args(["form", "table"])))]
    Resolve {
        /// Path to the feature spec
        #[arg(short, long, default_value = "feature.xml")]
        file: PathBuf,

        /// Form id
        #[arg(long)]
        form: Option<String>,

        /// Data table id
        #[arg(long)]
        table: Option<String>,
    },

    /// Run the load sequence for the configured feature
    Load {
        /// Path to forma.yaml
        #[arg(short, long, default_value = CONFIG_FILE)]
        config: PathBuf,
    },

    /// Execute a named query through the gateway
    Query {
        /// Path to forma.yaml
        #[arg(short, long, default_value = CONFIG_FILE)]
        config: PathBuf,

        /// Query id
        id: String,

        /// Parameter as key=value (repeatable)
        #[arg(short = 'p', long = "param")]
        params: Vec<String>,
    },

    /// Execute a named action through the gateway
    Action {
        /// Path to forma.yaml
        #[arg(short, long, default_value = CONFIG_FILE)]
        config: PathBuf,

        /// Action id
        id: String,

        /// Parameter as key=value (repeatable)
        #[arg(short = 'p', long = "param")]
        params: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl Commands {
    /// Config file the command reads, if any.
    pub fn config_path(&self) -> Option<&Path> {
        match self {
            Self::Load { config } | Self::Query { config, .. } | Self::Action { config, .. } => {
                Some(config.as_path())
            }
            _ => None,
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `default_level`.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Log level from the command's config file, falling back to `warn`.
pub fn configured_log_level(cmd: &Commands) -> String {
    cmd.config_path()
        .and_then(|path| RuntimeConfig::load(path).ok())
        .map(|config| config.log_level)
        .unwrap_or_else(|| "warn".to_string())
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file, strict } => cmd_validate(&file, strict),
        Commands::Compile {
            file,
            format,
            strict,
        } => cmd_compile(&file, format, strict),
        Commands::Params { text } => cmd_params(&text),
        Commands::Resolve { file, form, table } => {
            cmd_resolve(&file, form.as_deref(), table.as_deref())
        }
        Commands::Load { config } => cmd_load(&config),
        Commands::Query { config, id, params } => cmd_query(&config, &id, &params),
        Commands::Action { config, id, params } => cmd_action(&config, &id, &params),
    }
}

/// Run a future to completion on a current-thread runtime.
fn block_on<F: Future>(future: F) -> Result<F::Output, String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("cannot start runtime: {}", e))?;
    Ok(runtime.block_on(future))
}

const SAMPLE_SPEC: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<Feature name="orders" version="1.0">
  <Backend>
    <Query id="ListOrders" type="Select" description="Orders for one customer">
      SELECT id, customer, status, total FROM orders WHERE customer = :customer
    </Query>
    <Query id="OrderStatuses" type="Select">SELECT code, label FROM order_status</Query>
    <ActionQuery id="UpdateOrder" type="Update">
      UPDATE orders SET status = :status WHERE id = :id
    </ActionQuery>
  </Backend>
  <Frontend>
    <DataTable id="OrdersTable" queryRef="ListOrders" title="Orders" pageSize="25" sortable="true" rowActions="EditOrder">
      <Column name="id" label="#" type="Number" width="80"/>
      <Column name="customer" label="Customer"/>
      <Column name="status" type="Badge"/>
      <Column name="total" type="Currency" align="right" format="0.00"/>
    </DataTable>
    <Form id="EditOrder" mode="Edit" dialog="true" actionRef="UpdateOrder">
      <Field name="id" type="Hidden"/>
      <Field name="status" type="Select" required="true"/>
      <Button type="Submit" label="Save"/>
      <Button type="Cancel"/>
      <Message type="Info">Changes apply immediately.</Message>
    </Form>
  </Frontend>
  <Mapping name="status" type="Select" label="Status">
    <ListQuery ref="OrderStatuses" labelField="label" valueField="code"/>
  </Mapping>
</Feature>
"##;

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join(CONFIG_FILE);
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }
    std::fs::create_dir_all(path)
        .map_err(|e| format!("cannot create {}: {}", path.display(), e))?;

    let mut config = RuntimeConfig::new("orders");
    config.spec = PathBuf::from("feature.xml");
    let spec_path = path.join(&config.spec);
    let template = config.to_yaml().map_err(|e| e.to_string())?;

    std::fs::write(&config_path, template)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;
    if !spec_path.exists() {
        std::fs::write(&spec_path, SAMPLE_SPEC)
            .map_err(|e| format!("cannot write {}: {}", spec_path.display(), e))?;
    }

    println!("Initialized forma project at {}", path.display());
    println!("  Created: {}", config_path.display());
    println!("  Created: {}", spec_path.display());
    Ok(())
}

fn compile_file(file: &Path, strict: bool) -> Result<parser::Compiled, String> {
    parser::parse_spec_file(file, ParseOptions { strict }).map_err(|e| e.to_string())
}

fn summary(def: &FeatureDefinition) -> String {
    format!(
        "{} v{} ({} queries, {} actions, {} tables, {} forms, {} mappings)",
        def.name,
        if def.version.is_empty() { "?" } else { def.version.as_str() },
        def.backend.queries.len(),
        def.backend.action_queries.len(),
        def.frontend.data_tables.len(),
        def.frontend.forms.len(),
        def.mappings.len()
    )
}

fn cmd_validate(file: &Path, strict: bool) -> Result<(), String> {
    let compiled = compile_file(file, strict)?;
    if compiled.warnings.is_empty() {
        println!("OK: {}", summary(&compiled.definition));
        return Ok(());
    }
    for w in &compiled.warnings {
        eprintln!("  WARN: {}", w);
    }
    Err(format!("{} validation issue(s)", compiled.warnings.len()))
}

fn render(def: &FeatureDefinition, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(def).map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml_ng::to_string(def).map_err(|e| e.to_string()),
    }
}

fn cmd_compile(file: &Path, format: OutputFormat, strict: bool) -> Result<(), String> {
    let compiled = compile_file(file, strict)?;
    for w in &compiled.warnings {
        eprintln!("  WARN: {}", w);
    }
    tracing::info!(fingerprint = %compiled.definition.fingerprint(), "compiled");
    println!("{}", render(&compiled.definition, format)?);
    Ok(())
}

fn cmd_params(text: &str) -> Result<(), String> {
    let params = extract_parameters(text);
    if params.is_empty() {
        println!("(no parameters)");
    }
    for p in &params {
        println!(":{}", p.name);
    }
    Ok(())
}

/// Resolved form or table as YAML.
fn resolve_target(
    def: &FeatureDefinition,
    form: Option<&str>,
    table: Option<&str>,
) -> Result<String, String> {
    let mappings = MappingTable::build(def.mappings.iter().cloned());
    let yaml = match (form, table) {
        (Some(id), _) => {
            let form = def
                .form(id)
                .ok_or_else(|| Error::lookup(LookupKind::Form, id).to_string())?;
            serde_yaml_ng::to_string(&resolver::resolve_form(form, &mappings))
        }
        (None, Some(id)) => {
            let data_table = def
                .data_table(id)
                .ok_or_else(|| Error::lookup(LookupKind::DataTable, id).to_string())?;
            serde_yaml_ng::to_string(&resolver::resolve_table(data_table, &mappings))
        }
        (None, None) => return Err("either --form or --table is required".to_string()),
    };
    yaml.map_err(|e| e.to_string())
}

fn cmd_resolve(file: &Path, form: Option<&str>, table: Option<&str>) -> Result<(), String> {
    let compiled = compile_file(file, false)?;
    print!("{}", resolve_target(&compiled.definition, form, table)?);
    Ok(())
}

fn open_context(config_path: &Path) -> Result<FeatureContext, String> {
    let config = RuntimeConfig::load(config_path).map_err(|e| e.to_string())?;
    FeatureContext::from_config(&config, Arc::new(TracingHooks)).map_err(|e| e.to_string())
}

fn cmd_load(config_path: &Path) -> Result<(), String> {
    let mut ctx = open_context(config_path)?;
    let revision = block_on(ctx.load())?.map_err(|e| e.to_string())?;
    let def = ctx
        .definition()
        .ok_or_else(|| "load reported success but no definition is held".to_string())?;
    println!("{}: {}", ctx.state(), summary(def));
    println!("  revision: {}", revision);
    println!("  fingerprint: {}", def.fingerprint());
    Ok(())
}

fn cmd_query(config_path: &Path, id: &str, pairs: &[String]) -> Result<(), String> {
    let params = parse_params(pairs)?;
    let ctx = open_context(config_path)?;
    let resp = block_on(ctx.execute_query(id, &params))?.map_err(|e| e.to_string())?;
    println!(
        "{}",
        serde_json::to_string_pretty(&resp).map_err(|e| e.to_string())?
    );
    Ok(())
}

fn cmd_action(config_path: &Path, id: &str, pairs: &[String]) -> Result<(), String> {
    let params = parse_params(pairs)?;
    let ctx = open_context(config_path)?;
    let resp = block_on(ctx.execute_action(id, &params))?.map_err(|e| e.to_string())?;
    println!(
        "{}",
        serde_json::to_string_pretty(&resp).map_err(|e| e.to_string())?
    );
    if resp.success {
        Ok(())
    } else {
        Err(format!(
            "action '{}' failed: {}",
            id,
            resp.message.as_deref().unwrap_or("no message")
        ))
    }
}
