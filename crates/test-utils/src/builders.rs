#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use sitepipe::config::{ConfigFile, RawConfigFile};
use sitepipe::context::BuildContext;
use tempfile::TempDir;

pub const STYLE_SCSS: &str = "@import 'vars';\n\n.header {\n  color: $brand;\n  .title { user-select: none; }\n}\n";
pub const VARS_SCSS: &str = "$brand: #336699;\n";
pub const JQUERY_JS: &str = "/* jquery stand-in */\nvar jQuery = function (sel) { return document.querySelectorAll(sel); };\n";
pub const MAIN_JS: &str = "// app code\njQuery('.header').forEach(function (el) { el.hidden = false; });\n";

/// A throwaway project directory.
pub struct ProjectFixture {
    dir: TempDir,
}

impl ProjectFixture {
    /// An empty project.
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().expect("creating temp project dir"),
        }
    }

    /// The stock layout: one stylesheet with a partial, a library and an
    /// app script, and two pages (one nested).
    pub fn stock() -> Self {
        let fixture = Self::empty();
        fixture
            .write("app/scss/style.scss", STYLE_SCSS)
            .write("app/scss/_vars.scss", VARS_SCSS)
            .write("node_modules/jquery/dist/jquery.js", JQUERY_JS)
            .write("app/js/main.js", MAIN_JS)
            .write(
                "app/index.html",
                "<html><head><link rel=\"stylesheet\" href=\"css/style.min.css\"></head><body><h1 class=\"title\">Home</h1></body></html>\n",
            )
            .write(
                "app/pages/about.html",
                "<html><body><p>About</p></body></html>\n",
            );
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) -> &Self {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("creating fixture dirs");
        }
        fs::write(&path, contents).expect("writing fixture file");
        self
    }

    /// Swap in new contents with a rename, so a watcher never sees the
    /// file truncated or half written.
    pub fn replace(&self, rel: &str, contents: impl AsRef<[u8]>) -> &Self {
        let staged = format!("{rel}.staged");
        self.write(&staged, contents);
        fs::rename(self.path(&staged), self.path(rel)).expect("renaming staged fixture file");
        self
    }

    pub fn read(&self, rel: &str) -> Vec<u8> {
        fs::read(self.path(rel)).unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    pub fn read_string(&self, rel: &str) -> String {
        String::from_utf8(self.read(rel)).expect("fixture file is not UTF-8")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// Every file under `rel`, relative to it, sorted, with `/` separators.
    pub fn list_files(&self, rel: &str) -> Vec<String> {
        let base = self.path(rel);
        let mut out = Vec::new();
        collect_files(&base, &base, &mut out);
        out.sort();
        out
    }

    pub fn context(&self, cfg: ConfigFile) -> BuildContext {
        BuildContext::new(self.root(), cfg)
    }

    pub fn default_context(&self) -> BuildContext {
        self.context(ConfigFile::default())
    }
}

fn collect_files(base: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(base, &path, out);
        } else if let Ok(rel) = path.strip_prefix(base) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
}

/// Builder for `ConfigFile` from TOML snippets.
pub struct ConfigFileBuilder {
    toml: String,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            toml: String::new(),
        }
    }

    /// Append a raw TOML fragment.
    pub fn with_toml(mut self, fragment: &str) -> Self {
        self.toml.push_str(fragment);
        self.toml.push('\n');
        self
    }

    pub fn with_series_task(self, name: &str, members: &[&str]) -> Self {
        let fragment = format!("[tasks.{name}]\nseries = {members:?}\n");
        self.with_toml(&fragment)
    }

    pub fn with_parallel_task(self, name: &str, members: &[&str]) -> Self {
        let fragment = format!("[tasks.{name}]\nparallel = {members:?}\n");
        self.with_toml(&fragment)
    }

    pub fn build(self) -> ConfigFile {
        let raw: RawConfigFile = toml::from_str(&self.toml).expect("builder produced invalid TOML");
        ConfigFile::try_from(raw).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
