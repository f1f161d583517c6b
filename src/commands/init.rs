//! Initialize the formbridge directory

use colored::*;
use eyre::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{CONFIG_FILE, Config, PathsConfig};
use crate::integration::builtin;
use crate::integration::manifest::MANIFEST_FILE;

/// Sample form settings, written only when the forms directory is empty
const SAMPLE_FORM: &str = r#"# Integrations enabled for the "contact" form.
# Keys under each integration override the global settings in settings/integrations.yaml.
integrations:
  mailchimp:
    enabled: false
    action: subscribe
    field_mapping:
      email_address: your-email
      FNAME: your-name
  hubspot:
    enabled: false
    action: create_contact
"#;

fn sample_manifest(kind: &str) -> String {
    format!(
        "# Remove this folder (or set enabled: false) to unregister the integration.\nintegration:\n  kind: {}\nenabled: true\n",
        kind
    )
}

fn write_manifests(integrations_dir: &Path, force: bool) -> Result<()> {
    for kind in builtin::kinds() {
        let folder = integrations_dir.join(kind);
        let manifest = folder.join(MANIFEST_FILE);
        if manifest.exists() && !force {
            println!("  {} integrations/{}/ already present", "✓".green(), kind);
            continue;
        }
        fs::create_dir_all(&folder).context(format!("Failed to create integrations/{}", kind))?;
        fs::write(&manifest, sample_manifest(kind)).context(format!("Failed to write {}", manifest.display()))?;
        println!("  {} Created integrations/{}/{}", "✓".green(), kind, MANIFEST_FILE);
    }
    Ok(())
}

pub fn run(path: Option<PathBuf>, force: bool) -> Result<()> {
    let base_dir = path.unwrap_or_else(Config::base_dir);

    println!("{} Initializing formbridge in {}", "→".blue(), base_dir.display());

    let config_file = base_dir.join(CONFIG_FILE);
    if config_file.exists() && !force {
        println!("  {} formbridge already initialized at {}", "✓".green(), base_dir.display());
        println!("  Use {} to reinitialize", "--force".cyan());
        return Ok(());
    }

    for dir in ["integrations", "settings", "forms", "logs"] {
        fs::create_dir_all(base_dir.join(dir)).context(format!("Failed to create {}", dir))?;
        println!("  {} Created {}/", "✓".green(), dir);
    }

    write_manifests(&base_dir.join("integrations"), force)?;

    let sample_form = base_dir.join("forms").join("contact.yaml");
    if !sample_form.exists() {
        fs::write(&sample_form, SAMPLE_FORM).context("Failed to write sample form settings")?;
        println!("  {} Created forms/contact.yaml", "✓".green());
    }

    // Paths point into the initialized directory, wherever it is
    let config = Config {
        paths: PathsConfig {
            integrations: base_dir.join("integrations"),
            settings: base_dir.join("settings"),
            forms: base_dir.join("forms"),
            logs: base_dir.join("logs"),
        },
        ..Config::default()
    };
    let yaml_str = serde_yaml::to_string(&config).context("Failed to serialize config")?;
    fs::write(&config_file, yaml_str).context(format!("Failed to write {}", CONFIG_FILE))?;
    println!("  {} Created {}", "✓".green(), CONFIG_FILE);

    println!();
    println!("{} formbridge initialized!", "✓".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  1. Run {} to add credentials",
        "formbridge settings set mailchimp api_key <key>".cyan()
    );
    println!(
        "  2. Run {} to route a form",
        "formbridge form enable contact mailchimp --set audience_id=<id>".cyan()
    );
    println!("  3. Run {} to verify setup", "formbridge status".cyan());

    Ok(())
}
