//! Integration inspection commands

use colored::*;
use eyre::Result;
use indexmap::IndexMap;
use serde::Serialize;

use crate::app::App;
use crate::cli::{IntegrationAction, OutputFormat};
use crate::config::Config;
use crate::dispatch::resolve_settings;
use crate::integration::registry::IntegrationSummary;
use crate::integration::{ActionSpec, FieldSpec, Integration, IntegrationMeta, Settings, merge_settings};

pub fn run(action: IntegrationAction, config: &Config) -> Result<()> {
    let app = App::bootstrap(config.clone())?;

    match action {
        IntegrationAction::List { format, configured } => list(OutputFormat::resolve(format), configured, &app),
        IntegrationAction::Info { id, format } => info(&id, OutputFormat::resolve(format), &app),
        IntegrationAction::Test { id } => test(&id, &app),
        IntegrationAction::Validate { id, form } => validate(&id, form.as_deref(), &app),
    }
}

fn lookup<'a>(app: &'a App, id: &str) -> Result<&'a dyn Integration> {
    app.registry.get(id).ok_or_else(|| {
        let known: Vec<&str> = app.registry.ids().collect();
        eyre::eyre!("Integration not registered: {} (registered: {})", id, known.join(", "))
    })
}

fn list(format: OutputFormat, configured_only: bool, app: &App) -> Result<()> {
    let summaries: IndexMap<String, IntegrationSummary> = if configured_only {
        app.registry
            .configured()
            .map(|i| (i.id().to_string(), IntegrationSummary::of(i)))
            .collect()
    } else {
        app.registry.to_array()
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&summaries)?),
        OutputFormat::Text => {
            println!(
                "{} ({}):",
                "Integrations".bold(),
                format!("{} registered", summaries.len()).dimmed()
            );
            println!();

            if summaries.is_empty() {
                println!("  {}", "(none)".dimmed());
            }

            for summary in summaries.values() {
                let badge = if summary.configured {
                    "[configured]".green().to_string()
                } else {
                    "[not configured]".yellow().to_string()
                };
                println!(
                    "  {} {} {} {}",
                    if summary.configured { "✓".green() } else { "○".dimmed() },
                    summary.id.cyan(),
                    format!("v{}", summary.version).dimmed(),
                    badge
                );
                if !summary.description.is_empty() {
                    println!("      {}", summary.description.dimmed());
                }
            }

            if !app.discovery.skipped.is_empty() {
                println!();
                for skipped in &app.discovery.skipped {
                    println!(
                        "  {} {} {}",
                        "⚠".yellow(),
                        skipped.folder,
                        format!("({})", skipped.reason).dimmed()
                    );
                }
            }
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct ActionDetail {
    #[serde(flatten)]
    action: ActionSpec,
    field_mapping: Vec<FieldSpec>,
}

#[derive(Serialize)]
struct IntegrationDetail {
    #[serde(flatten)]
    meta: IntegrationMeta,
    configured: bool,
    auth_fields: Vec<FieldSpec>,
    actions: Vec<ActionDetail>,
    settings_schema: Vec<FieldSpec>,
    default_settings: Settings,
}

fn info(id: &str, format: OutputFormat, app: &App) -> Result<()> {
    let integration = lookup(app, id)?;

    let detail = IntegrationDetail {
        meta: integration.meta().clone(),
        configured: integration.is_configured(),
        auth_fields: integration.auth_fields(),
        actions: integration
            .actions()
            .into_iter()
            .map(|action| ActionDetail {
                field_mapping: integration.field_mapping(&action.id),
                action,
            })
            .collect(),
        settings_schema: integration.settings_schema(),
        default_settings: integration.default_settings(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&detail)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&detail)?),
        OutputFormat::Text => print_detail(&detail),
    }

    Ok(())
}

fn print_detail(detail: &IntegrationDetail) {
    println!("{} {}", detail.meta.name.bold(), format!("v{}", detail.meta.version).dimmed());
    if !detail.meta.description.is_empty() {
        println!("  {}", detail.meta.description);
    }
    println!();

    println!("  {:14} {}", "Id:".dimmed(), detail.meta.id);
    println!(
        "  {:14} {}",
        "Configured:".dimmed(),
        if detail.configured { "yes".green() } else { "no".yellow() }
    );
    println!();

    println!("{}:", "Auth fields".cyan());
    print_fields(&detail.auth_fields);
    println!();

    println!("{}:", "Actions".cyan());
    for action in &detail.actions {
        println!("  {} {}", action.action.id.green(), action.action.description.dimmed());
        for field in &action.field_mapping {
            println!("      {} {}", "→".blue(), field.key);
        }
    }
    println!();

    println!("{}:", "Settings".cyan());
    print_fields(&detail.settings_schema);
}

fn print_fields(fields: &[FieldSpec]) {
    if fields.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for field in fields {
        let required = if field.required { " *".red().to_string() } else { String::new() };
        let kind = format!("[{:?}]", field.kind).to_lowercase();
        println!("  {:20} {}{}", field.key, kind.dimmed(), required);
        if let Some(ref description) = field.description {
            println!("      {}", description.dimmed());
        }
    }
}

fn test(id: &str, app: &App) -> Result<()> {
    let integration = lookup(app, id)?;

    println!("{} Testing connection: {}", "→".blue(), id.cyan());
    let result = integration.test_connection();

    if result.success {
        println!("  {} {}", "✓".green(), result.message);
        Ok(())
    } else {
        println!("  {} {}", "✗".red(), result.message);
        std::process::exit(1);
    }
}

fn validate(id: &str, form: Option<&str>, app: &App) -> Result<()> {
    let integration = lookup(app, id)?;
    let global = app.globals.get(id);

    let settings = match form {
        Some(form_id) => {
            let forms = app.forms.load(form_id)?;
            let Some(form_settings) = forms.get(id) else {
                eyre::bail!("Form '{}' has no settings for '{}'", form_id, id);
            };
            resolve_settings(integration, &global, form_settings)
        }
        None => merge_settings(&integration.default_settings(), &global),
    };

    let scope = form.map(|f| format!("{} (form {})", id, f)).unwrap_or_else(|| id.to_string());
    println!("{} Validating settings: {}", "→".blue(), scope.cyan());

    let errors = integration.validate_settings(&settings);
    if errors.is_empty() {
        println!("  {} Settings are valid", "✓".green());
        return Ok(());
    }

    for error in &errors {
        println!("  {} {}: {}", "✗".red(), error.field.bold(), error.message);
    }
    std::process::exit(1);
}
