use anyhow::{anyhow, bail, Context};
use clap::{Parser, ValueEnum};
use emoji_config::{EmojiConfig, NestedSettings};
use observable_config_codecs::default_registry;
use observable_config_core::{ConfigNode, FieldKind, FieldMeta, PersistenceContext, RootConfig};
use std::path::PathBuf;
use std::rc::Rc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "emoji-config")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Application root folder; the file lives under `<root>/config/`
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// File format
    #[arg(short, long, value_enum, default_value_t = Format::Yaml)]
    format: Format,

    /// Edit to apply, e.g. `Settings.NestedValue=x` or
    /// `CustomSettings[0].NestedNumber=3` (may be repeated)
    #[arg(short, long = "set", value_name = "PATH=VALUE")]
    set: Vec<String>,

    /// Print the resulting document
    #[arg(long)]
    print: bool,

    /// List the editable fields and exit
    #[arg(long)]
    fields: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

impl Format {
    fn ext(self) -> &'static str {
        match self {
            Format::Yaml => ".yaml",
            Format::Json => ".json",
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,observable_config_core=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    if args.fields {
        print_fields(EmojiConfig::FIELDS, "");
        return Ok(());
    }

    let context = PersistenceContext::new()
        .with_root_folder(&args.root)
        .with_codecs(default_registry());
    let descriptor = EmojiConfig::DESCRIPTOR.ext(args.format.ext());

    let config = context
        .load_with::<EmojiConfig>(&descriptor)
        .context("loading emoji config")?;

    tracing::info!(
        path = %config.coordinator().location().path().display(),
        version = descriptor.version.unwrap_or("-"),
        "Emoji config ready"
    );

    let _changes = config.core().on_change(|event| {
        tracing::info!(
            path = %event.full_path,
            old = %event.old_value,
            new = %event.new_value,
            auto_save = event.auto_save,
            "Config changed"
        );
        Ok(())
    });

    for edit in &args.set {
        let (path, value) = edit
            .split_once('=')
            .ok_or_else(|| anyhow!("expected PATH=VALUE, got `{edit}`"))?;
        let changed = apply(&config, path.trim(), value.trim()).with_context(|| format!("applying `{edit}`"))?;
        if !changed {
            tracing::info!(path, "Value unchanged");
        }
    }

    tracing::info!(saves = config.coordinator().save_count(), "Done");

    if args.print {
        println!("{}", serde_json::to_string_pretty(&*config)?);
    }

    Ok(())
}

fn print_fields(fields: &[FieldMeta], indent: &str) {
    for field in fields {
        println!(
            "{indent}{:<20} {:<18} {}{}",
            field.name,
            format!("{:?}", field.kind),
            field.description.unwrap_or(""),
            if field.auto_save { "" } else { " (manual save)" },
        );
        if matches!(field.kind, FieldKind::Entity | FieldKind::EntityCollection) {
            print_fields(NestedSettings::FIELDS, "  ");
        }
    }
}

/// Apply one textual edit. Returns whether anything changed.
fn apply(config: &EmojiConfig, path: &str, value: &str) -> anyhow::Result<bool> {
    let head = path.split(['.', '[']).next().unwrap_or(path);
    let meta = EmojiConfig::field(head).ok_or_else(|| anyhow!("unknown field `{head}`"))?;

    let changed = match (meta.kind, head) {
        (FieldKind::Scalar, _) if head != path => bail!("`{head}` has no nested fields"),
        (_, "DefaultEmojiSize") => config.set_default_emoji_size(value.parse()?)?,
        (_, "EnableAutoComplete") => config.set_enable_auto_complete(value.parse()?)?,
        (_, "MaxEmojiHistory") => config.set_max_emoji_history(value.parse()?)?,
        (_, "DefaultSkinTone") => config.set_default_skin_tone(value)?,
        (_, "AnimationSpeed") => config.set_animation_speed(value.parse()?)?,
        (FieldKind::ValueCollection, _) => config.set_favorite_emojis(
            value
                .split(',')
                .map(str::trim)
                .filter(|emoji| !emoji.is_empty())
                .map(String::from)
                .collect(),
        )?,
        (FieldKind::Entity, _) => {
            let field = path
                .strip_prefix("Settings.")
                .ok_or_else(|| anyhow!("expected Settings.<field>"))?;
            apply_nested(&*config.settings(), field, value)?
        }
        (FieldKind::EntityCollection, _) => {
            let (index, field) = path
                .strip_prefix("CustomSettings[")
                .and_then(|rest| rest.split_once("]."))
                .ok_or_else(|| anyhow!("expected CustomSettings[<index>].<field>"))?;
            let index: usize = index.parse().context("collection index")?;
            apply_nested(&*custom_setting(config, index)?, field, value)?
        }
        (FieldKind::Scalar, _) => bail!("`{head}` cannot be edited from the command line"),
    };
    Ok(changed)
}

/// The item at `index`, appending a fresh one when `index` is one past
/// the end.
fn custom_setting(config: &EmojiConfig, index: usize) -> anyhow::Result<Rc<NestedSettings>> {
    let items = config.custom_settings();
    if let Some(item) = items.get(index) {
        return Ok(item);
    }
    if index != items.len() {
        bail!("index {index} out of range ({} items)", items.len());
    }
    let item = Rc::new(NestedSettings::new());
    config.add_custom_setting(item.clone())?;
    Ok(item)
}

fn apply_nested(settings: &NestedSettings, field: &str, value: &str) -> anyhow::Result<bool> {
    let meta = NestedSettings::field(field).ok_or_else(|| anyhow!("unknown field `{field}`"))?;
    let changed = match meta.name {
        "NestedValue" => settings.set_nested_value(value)?,
        "NestedNumber" => settings.set_nested_number(value.parse()?)?,
        "NestedBoolean" => settings.set_nested_boolean(value.parse()?)?,
        _ => bail!("`{field}` cannot be edited from the command line"),
    };
    Ok(changed)
}
