// tests/build_end_to_end.rs

use sitepipe::config::ConfigFile;
use sitepipe::dag::Unit;
use sitepipe::dag::builtin::builtin_graph;
use sitepipe::pipeline::deploy::deploy;
use sitepipe::run_tasks;
use sitepipe::server::ReloadHandle;
use sitepipe::types::PipelineKind;
use sitepipe_test_utils::builders::ProjectFixture;
use sitepipe_test_utils::{init_tracing, with_timeout};

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn clean_then_build_mirrors_app_into_dist() {
    init_tracing();
    let project = ProjectFixture::stock();
    project.write("dist/stale.txt", "left over from an old build");

    let ctx = project.default_context();
    let graph = builtin_graph();
    let summary = with_timeout(run_tasks(&ctx, &graph, &names(&["build"]), false))
        .await
        .unwrap();

    assert!(summary.is_success(), "{summary:?}");
    assert_eq!(
        project.list_files("dist"),
        vec![
            "css/style.min.css",
            "index.html",
            "js/main.min.js",
            "pages/about.html",
        ]
    );
    assert_eq!(project.read("dist/index.html"), project.read("app/index.html"));
    assert_eq!(
        project.read("dist/css/style.min.css"),
        project.read("app/css/style.min.css")
    );
}

#[tokio::test]
async fn scripts_keep_library_before_app_code() {
    init_tracing();
    let project = ProjectFixture::stock();
    let ctx = project.default_context();

    let summary = with_timeout(run_tasks(&ctx, &builtin_graph(), &names(&["scripts"]), false))
        .await
        .unwrap();
    assert!(summary.is_success());

    let out = project.read_string("app/js/main.min.js");
    let lib = out.find("querySelectorAll").expect("library code missing");
    let app = out.find("hidden").expect("app code missing");
    assert!(lib < app, "library must come first:\n{out}");
    assert!(!out.contains("jquery stand-in"), "comments should be stripped");
}

#[test]
fn styles_are_byte_identical_across_runs() {
    let project = ProjectFixture::stock();
    let ctx = project.default_context();
    let pipeline = ctx.pipeline(PipelineKind::Styles).unwrap();
    let reload = ReloadHandle::new();

    pipeline.run(&reload).unwrap();
    let first = project.read("app/css/style.min.css");
    pipeline.run(&reload).unwrap();
    let second = project.read("app/css/style.min.css");

    assert_eq!(first, second);
    let css = String::from_utf8(first).unwrap();
    assert!(css.contains("#336699") || css.contains("#369"), "{css}");
}

#[tokio::test]
async fn invalid_scss_fails_without_writing() {
    init_tracing();
    let project = ProjectFixture::stock();
    project.write("app/scss/style.scss", ".broken { color: ; \n");
    let ctx = project.default_context();

    let summary = with_timeout(run_tasks(&ctx, &builtin_graph(), &names(&["styles"]), false))
        .await
        .unwrap();

    assert_eq!(summary.failed(), vec![Unit::Pipeline(PipelineKind::Styles)]);
    assert!(!project.exists("app/css/style.min.css"));
}

#[tokio::test]
async fn failed_styles_stops_the_build() {
    init_tracing();
    let project = ProjectFixture::stock();
    project.write("app/scss/style.scss", ".broken { color: ; \n");
    let ctx = project.default_context();

    let summary = with_timeout(run_tasks(&ctx, &builtin_graph(), &names(&["build"]), false))
        .await
        .unwrap();

    assert!(!summary.is_success());
    assert_eq!(summary.succeeded(), vec![Unit::CleanDist]);
    assert_eq!(summary.skipped().len(), 3);
    assert!(!project.exists("dist"));
    assert!(!project.exists("app/js/main.min.js"));
}

#[tokio::test]
async fn empty_project_builds_nothing() {
    init_tracing();
    let project = ProjectFixture::empty();
    let ctx = project.context(ConfigFile::default());

    let summary = with_timeout(run_tasks(
        &ctx,
        &builtin_graph(),
        &names(&["styles", "scripts", "images"]),
        false,
    ))
    .await
    .unwrap();

    assert!(summary.is_success());
    assert!(project.list_files(".").is_empty());
}

#[tokio::test]
async fn deploy_never_publishes() {
    init_tracing();
    let project = ProjectFixture::stock();
    let ctx = project.default_context();
    with_timeout(run_tasks(&ctx, &builtin_graph(), &names(&["build"]), false))
        .await
        .unwrap();

    let report = deploy(project.root(), &ctx.config().deploy).unwrap();
    assert_eq!(report.staged.len(), 4);
    assert!(!report.published);
    assert!(!project.exists(".git"));
    assert!(!project.exists("dist/.git"));

    let summary = with_timeout(run_tasks(&ctx, &builtin_graph(), &names(&["deploy"]), false))
        .await
        .unwrap();
    assert!(summary.is_success());
    assert!(!project.exists(".git"));
}
