// build.rs

use std::collections::BTreeMap;
use std::env;
use std::error::Error;
use std::fs;
use std::path::Path;

type Messages = BTreeMap<String, String>;

fn main() -> Result<(), Box<dyn Error>> {
    let lang = effective_language();
    println!("cargo:rustc-env=CMDTRAY_LANG_EFFECTIVE={}", lang);
    println!("cargo:rerun-if-env-changed=CMDTRAY_LANG");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=locales/");

    // English is always loaded so missing keys in other locales fall back to it.
    let mut messages = load_locale(Path::new("locales/en.toml"))?;
    if lang != "en" {
        let path = format!("locales/{}.toml", lang);
        if Path::new(&path).exists() {
            messages.extend(load_locale(Path::new(&path))?);
        } else {
            println!(
                "cargo:warning=Language file '{}' not found. Falling back to 'en'.",
                path
            );
        }
    }

    let out_dir = env::var("OUT_DIR")?;
    fs::write(
        Path::new(&out_dir).join("translations.rs"),
        render_macro(&messages),
    )?;
    Ok(())
}

/// A `lang_*` feature wins over `CMDTRAY_LANG`, which wins over English.
fn effective_language() -> String {
    let mut features: Vec<String> = env::vars()
        .filter_map(|(key, _)| {
            key.strip_prefix("CARGO_FEATURE_LANG_")
                .map(str::to_lowercase)
        })
        .collect();
    features.sort();

    match features.first() {
        Some(first) => {
            if features.len() > 1 {
                println!(
                    "cargo:warning=Multiple language features enabled ({:?}). Using '{}'.",
                    features, first
                );
            }
            first.clone()
        }
        None => env::var("CMDTRAY_LANG").unwrap_or_else(|_| "en".to_string()),
    }
}

fn load_locale(path: &Path) -> Result<Messages, Box<dyn Error>> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    let table: toml::Table = toml::from_str(&content)
        .map_err(|e| format!("failed to parse '{}': {}", path.display(), e))?;

    let mut messages = Messages::new();
    flatten("", &table, &mut messages)?;
    Ok(messages)
}

/// `[a.b] c = "x"` becomes `"a.b.c" => "x"`.
fn flatten(prefix: &str, table: &toml::Table, out: &mut Messages) -> Result<(), Box<dyn Error>> {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            toml::Value::String(text) => {
                out.insert(full_key, text.clone());
            }
            toml::Value::Table(inner) => flatten(&full_key, inner, out)?,
            other => {
                return Err(format!(
                    "message '{}' must be a string, found {}",
                    full_key,
                    other.type_str()
                )
                .into());
            }
        }
    }
    Ok(())
}

fn render_macro(messages: &Messages) -> String {
    let mut code = String::from("/// Looks up a message by key at compile time.\n#[macro_export]\nmacro_rules! t {\n");
    for (key, value) in messages {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        code.push_str(&format!("    (\"{}\") => {{ \"{}\" }};\n", key, escaped));
    }
    // Unknown keys fail the build instead of rendering nothing.
    code.push_str(
        "    ($key:expr) => {{ compile_error!(concat!(\"Missing translation key: \", $key)) }};\n",
    );
    code.push_str("}\n");
    code
}
