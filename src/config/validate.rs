// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::builtin::BUILTIN_TASKS;
use crate::errors::{Result, SitepipeError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SitepipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_paths(cfg)?;
    validate_outputs(cfg)?;
    validate_images(cfg)?;
    validate_watch(cfg)?;
    validate_custom_tasks(cfg)?;
    validate_task_references(cfg)?;
    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    for (key, dir) in [("app", &cfg.paths.app), ("dist", &cfg.paths.dist)] {
        if dir.trim().is_empty() || dir.contains('{') || dir.contains('}') {
            return Err(SitepipeError::ConfigError(format!(
                "[paths].{key} must be a non-empty directory (got {dir:?})"
            )));
        }
    }
    Ok(())
}

fn validate_outputs(cfg: &RawConfigFile) -> Result<()> {
    for (section, output) in [
        ("styles", &cfg.styles.output),
        ("scripts", &cfg.scripts.output),
    ] {
        if output.trim().is_empty() || output.contains('/') || output.contains('\\') {
            return Err(SitepipeError::ConfigError(format!(
                "[{section}].output must be a plain file name (got {output:?})"
            )));
        }
    }
    Ok(())
}

fn validate_images(cfg: &RawConfigFile) -> Result<()> {
    if !(1..=100).contains(&cfg.images.jpeg_quality) {
        return Err(SitepipeError::ConfigError(format!(
            "[images].jpeg_quality must be within 1..=100 (got {})",
            cfg.images.jpeg_quality
        )));
    }
    if cfg.images.png_level > 6 {
        return Err(SitepipeError::ConfigError(format!(
            "[images].png_level must be within 0..=6 (got {})",
            cfg.images.png_level
        )));
    }
    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    // triggered_while_running_behaviour is strongly typed and validated
    // during deserialization.

    if cfg.watch.queue_length == 0 {
        return Err(SitepipeError::ConfigError(
            "[watch].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }

    for (idx, rule) in cfg.watch.rules.iter().enumerate() {
        if rule.watch.is_empty() {
            return Err(SitepipeError::ConfigError(format!(
                "[[watch.rule]] #{idx} has no `watch` patterns"
            )));
        }
    }

    Ok(())
}

fn validate_custom_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.tasks.iter() {
        if BUILTIN_TASKS.contains(&name.as_str()) {
            return Err(SitepipeError::ConfigError(format!(
                "task '{name}' is built in and cannot be redefined"
            )));
        }
        match (&task.series, &task.parallel) {
            (Some(_), None) | (None, Some(_)) => {}
            _ => {
                return Err(SitepipeError::ConfigError(format!(
                    "task '{name}' must set exactly one of `series` or `parallel`"
                )));
            }
        }
    }
    Ok(())
}

fn validate_task_references(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: referencing task -> referenced task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.tasks.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.tasks.iter() {
        let members = task.series.iter().chain(task.parallel.iter()).flatten();
        for member in members {
            if member == name {
                return Err(SitepipeError::TaskCycle(format!(
                    "task '{name}' cannot reference itself"
                )));
            }
            if BUILTIN_TASKS.contains(&member.as_str()) {
                continue;
            }
            if !cfg.tasks.contains_key(member) {
                return Err(SitepipeError::ConfigError(format!(
                    "task '{name}' references unknown task '{member}'"
                )));
            }
            graph.add_edge(name.as_str(), member.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(SitepipeError::TaskCycle(format!(
            "cycle detected in custom tasks involving '{}'",
            cycle.node_id()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(src)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn empty_file_is_valid() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.paths.dist, "dist");
        assert_eq!(cfg.watch.rules.len(), 3);
        assert_eq!(cfg.assemble.source[0], "app/**/*.html");
    }

    #[test]
    fn stock_paths_follow_the_paths_section() {
        let cfg = parse("[paths]\napp = \"src\"\ndist = \"public\"\n").unwrap();
        assert_eq!(cfg.styles.source, ["src/scss/style.scss"]);
        assert_eq!(cfg.styles.dest, "src/css");
        assert_eq!(cfg.scripts.source[1], "src/js/main.js");
        assert_eq!(cfg.images.dest, "public/images");
        assert_eq!(cfg.assemble.base, "src");
        assert_eq!(cfg.assemble.dest, "public");
        assert_eq!(cfg.server.base_dir, "src");
        assert_eq!(cfg.watch.rules[1].exclude, ["src/js/main.min.js"]);
        assert_eq!(cfg.deploy.source, ["public/**/*"]);
    }

    #[test]
    fn explicit_paths_are_kept_and_placeholders_expand() {
        let cfg = parse(
            "[paths]\napp = \"src\"\n[styles]\nsource = [\"theme/main.scss\"]\ndest = \"{app}/styles\"\n",
        )
        .unwrap();
        assert_eq!(cfg.styles.source, ["theme/main.scss"]);
        assert_eq!(cfg.styles.dest, "src/styles");
    }

    #[test]
    fn empty_app_dir_is_rejected() {
        let err = parse("[paths]\napp = \"\"\n").unwrap_err();
        assert!(matches!(err, SitepipeError::ConfigError(msg) if msg.contains("[paths].app")));
    }

    #[test]
    fn redefining_builtin_is_rejected() {
        let err = parse("[tasks.build]\nseries = [\"styles\"]\n").unwrap_err();
        assert!(matches!(err, SitepipeError::ConfigError(msg) if msg.contains("built in")));
    }

    #[test]
    fn both_series_and_parallel_is_rejected() {
        let err = parse("[tasks.x]\nseries = [\"styles\"]\nparallel = [\"scripts\"]\n").unwrap_err();
        assert!(matches!(err, SitepipeError::ConfigError(_)));
    }

    #[test]
    fn cyclic_custom_tasks_are_rejected() {
        let err = parse(
            "[tasks.a]\nseries = [\"b\"]\n[tasks.b]\nparallel = [\"styles\", \"a\"]\n",
        )
        .unwrap_err();
        assert!(matches!(err, SitepipeError::TaskCycle(_)));
    }

    #[test]
    fn out_of_range_png_level_is_rejected() {
        let err = parse("[images]\npng_level = 9\n").unwrap_err();
        assert!(matches!(err, SitepipeError::ConfigError(msg) if msg.contains("png_level")));
    }

    #[test]
    fn unknown_pipeline_in_rule_fails_to_parse() {
        let err = parse("[[watch.rule]]\nwatch = [\"a/**\"]\nrun = \"fonts\"\n").unwrap_err();
        assert!(matches!(err, SitepipeError::TomlError(_)));
    }
}
