//! CLI command implementations.

mod batch;
mod generate;

use mtc_config::Config;
use mtc_formats::GeneratorConfig;

pub(crate) use batch::BatchArgs;
pub(crate) use generate::GenerateArgs;

/// Generator settings from the loaded configuration.
fn generator_config(config: &Config) -> GeneratorConfig {
    GeneratorConfig {
        base_url: config.base_url().map(str::to_owned),
        language: config.language.clone(),
        inline_images: config.inline_images,
    }
}
