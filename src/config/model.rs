// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{PipelineKind, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from `Sitepipe.toml`.
///
/// ```toml
/// [paths]
/// app = "app"
/// dist = "dist"
///
/// [styles]
/// browsers = ["last 10 versions"]
///
/// [[watch.rule]]
/// watch = ["{app}/scss/**/*.scss"]
/// run = "styles"
///
/// [tasks.assets]
/// parallel = ["styles", "scripts"]
/// ```
///
/// Every section is optional; an empty file yields the stock layout
/// (`app/` sources, `dist/` output).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub styles: StylesSection,
    #[serde(default)]
    pub scripts: ScriptsSection,
    #[serde(default)]
    pub images: ImagesSection,
    #[serde(default)]
    pub assemble: AssembleSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub watch: WatchSection,
    #[serde(default)]
    pub deploy: DeploySection,

    /// Custom composite tasks from `[tasks.<name>]`.
    #[serde(default)]
    pub tasks: BTreeMap<String, CompositeTaskConfig>,
}

/// A validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on watch rules and custom tasks being well-formed.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub paths: PathsSection,
    pub styles: StylesSection,
    pub scripts: ScriptsSection,
    pub images: ImagesSection,
    pub assemble: AssembleSection,
    pub server: ServerSection,
    pub watch: WatchSection,
    pub deploy: DeploySection,
    pub tasks: BTreeMap<String, CompositeTaskConfig>,
}

impl ConfigFile {
    /// Builds the config without validation, expanding `{app}` and `{dist}`
    /// in every path-like value.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        let RawConfigFile {
            paths,
            mut styles,
            mut scripts,
            mut images,
            mut assemble,
            mut server,
            mut watch,
            mut deploy,
            tasks,
        } = raw;

        paths.expand_all(&mut styles.source);
        paths.expand(&mut styles.dest);
        paths.expand_all(&mut scripts.source);
        paths.expand(&mut scripts.dest);
        paths.expand_all(&mut images.source);
        paths.expand(&mut images.dest);
        paths.expand_all(&mut assemble.source);
        paths.expand(&mut assemble.base);
        paths.expand(&mut assemble.dest);
        paths.expand(&mut server.base_dir);
        for rule in &mut watch.rules {
            paths.expand_all(&mut rule.watch);
            paths.expand_all(&mut rule.exclude);
        }
        paths.expand_all(&mut deploy.source);

        Self {
            paths,
            styles,
            scripts,
            images,
            assemble,
            server,
            watch,
            deploy,
            tasks,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}

/// `[paths]` section.
///
/// Other sections may write `{app}` and `{dist}` in their paths; the stock
/// defaults do, so moving the source tree only takes `app = "src"`.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    /// Working source tree.
    #[serde(default = "default_app_dir")]
    pub app: String,
    /// Distribution tree removed by `cleanDist` and filled by `build`.
    #[serde(default = "default_dist_dir")]
    pub dist: String,
}

fn default_app_dir() -> String {
    "app".to_string()
}

fn default_dist_dir() -> String {
    "dist".to_string()
}

fn app_placeholder() -> String {
    "{app}".to_string()
}

fn dist_placeholder() -> String {
    "{dist}".to_string()
}

impl PathsSection {
    pub fn expand(&self, value: &mut String) {
        if value.contains('{') {
            *value = value.replace("{app}", &self.app).replace("{dist}", &self.dist);
        }
    }

    pub fn expand_all(&self, values: &mut [String]) {
        for value in values {
            self.expand(value);
        }
    }
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            app: default_app_dir(),
            dist: default_dist_dir(),
        }
    }
}

/// `[styles]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StylesSection {
    #[serde(default = "default_styles_source")]
    pub source: Vec<String>,
    #[serde(default = "default_styles_output")]
    pub output: String,
    #[serde(default = "default_styles_dest")]
    pub dest: String,
    /// Browserslist queries driving vendor prefixes.
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
    /// Compress the prefixed stylesheet.
    #[serde(default)]
    pub minify: bool,
}

fn default_styles_source() -> Vec<String> {
    vec!["{app}/scss/style.scss".to_string()]
}

fn default_styles_output() -> String {
    "style.min.css".to_string()
}

fn default_styles_dest() -> String {
    "{app}/css".to_string()
}

fn default_browsers() -> Vec<String> {
    vec!["last 10 versions".to_string()]
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            source: default_styles_source(),
            output: default_styles_output(),
            dest: default_styles_dest(),
            browsers: default_browsers(),
            minify: false,
        }
    }
}

/// `[scripts]` section.
///
/// `source` order is significant: files are concatenated in the order the
/// patterns are listed, so libraries go before the code that uses them.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptsSection {
    #[serde(default = "default_scripts_source")]
    pub source: Vec<String>,
    #[serde(default = "default_scripts_output")]
    pub output: String,
    #[serde(default = "default_scripts_dest")]
    pub dest: String,
}

fn default_scripts_source() -> Vec<String> {
    vec![
        "node_modules/jquery/dist/jquery.js".to_string(),
        "{app}/js/main.js".to_string(),
    ]
}

fn default_scripts_output() -> String {
    "main.min.js".to_string()
}

fn default_scripts_dest() -> String {
    "{app}/js".to_string()
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            source: default_scripts_source(),
            output: default_scripts_output(),
            dest: default_scripts_dest(),
        }
    }
}

/// `[images]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesSection {
    #[serde(default = "default_images_source")]
    pub source: Vec<String>,
    #[serde(default = "default_images_dest")]
    pub dest: String,
    /// JPEG re-encode quality, 1..=100.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// oxipng preset, 0..=6.
    #[serde(default = "default_png_level")]
    pub png_level: u8,
}

fn default_images_source() -> Vec<String> {
    vec!["{app}/images/**/*.*".to_string()]
}

fn default_images_dest() -> String {
    "{dist}/images".to_string()
}

fn default_jpeg_quality() -> u8 {
    75
}

fn default_png_level() -> u8 {
    5
}

impl Default for ImagesSection {
    fn default() -> Self {
        Self {
            source: default_images_source(),
            dest: default_images_dest(),
            jpeg_quality: default_jpeg_quality(),
            png_level: default_png_level(),
        }
    }
}

/// `[assemble]` section: the final copy into the distribution tree.
#[derive(Debug, Clone, Deserialize)]
pub struct AssembleSection {
    #[serde(default = "default_assemble_source")]
    pub source: Vec<String>,
    /// Paths are kept relative to this directory when copied.
    #[serde(default = "app_placeholder")]
    pub base: String,
    #[serde(default = "dist_placeholder")]
    pub dest: String,
}

fn default_assemble_source() -> Vec<String> {
    vec![
        "{app}/**/*.html".to_string(),
        "{app}/css/style.min.css".to_string(),
        "{app}/js/main.min.js".to_string(),
    ]
}

impl Default for AssembleSection {
    fn default() -> Self {
        Self {
            source: default_assemble_source(),
            base: app_placeholder(),
            dest: dist_placeholder(),
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "app_placeholder")]
    pub base_dir: String,
    /// Show an on-page notice when the browser reloads or injects styles.
    #[serde(default)]
    pub notify: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_dir: app_placeholder(),
            notify: false,
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued re-runs to remember per rule.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// Skip a re-run when the rule's files hash the same as last time.
    #[serde(default)]
    pub use_hash: bool,

    #[serde(default = "default_watch_rules", rename = "rule")]
    pub rules: Vec<WatchRuleConfig>,
}

fn default_queue_length() -> usize {
    1
}

fn default_watch_rules() -> Vec<WatchRuleConfig> {
    vec![
        WatchRuleConfig {
            watch: vec!["{app}/scss/**/*.scss".to_string()],
            exclude: Vec::new(),
            run: Some(PipelineKind::Styles),
            use_hash: None,
        },
        WatchRuleConfig {
            watch: vec!["{app}/js/**/*.js".to_string()],
            exclude: vec!["{app}/js/main.min.js".to_string()],
            run: Some(PipelineKind::Scripts),
            use_hash: None,
        },
        WatchRuleConfig {
            watch: vec!["{app}/**/*.html".to_string()],
            exclude: Vec::new(),
            run: None,
            use_hash: None,
        },
    ]
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
            use_hash: false,
            rules: default_watch_rules(),
        }
    }
}

/// `[[watch.rule]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchRuleConfig {
    pub watch: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Pipeline to re-run on change. Without one, a change only reloads
    /// connected browsers.
    #[serde(default)]
    pub run: Option<PipelineKind>,

    /// Per-rule override of `[watch].use_hash`.
    #[serde(default)]
    pub use_hash: Option<bool>,
}

impl WatchRuleConfig {
    pub fn effective_use_hash(&self, default_use_hash: bool) -> bool {
        self.use_hash.unwrap_or(default_use_hash)
    }
}

/// `[deploy]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploySection {
    #[serde(default = "default_deploy_source")]
    pub source: Vec<String>,
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_deploy_source() -> Vec<String> {
    vec!["{dist}/**/*".to_string()]
}

fn default_branch() -> String {
    "main".to_string()
}

impl Default for DeploySection {
    fn default() -> Self {
        Self {
            source: default_deploy_source(),
            remote_url: None,
            branch: default_branch(),
        }
    }
}

/// `[tasks.<name>]` entry: exactly one of `series` or `parallel`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CompositeTaskConfig {
    #[serde(default)]
    pub series: Option<Vec<String>>,
    #[serde(default)]
    pub parallel: Option<Vec<String>>,
}
