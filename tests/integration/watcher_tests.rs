//! Asset watcher against real directories and compiler processes.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use hive_sdk::{AssetWatcher, CompilerCommands, ExternalCompiler};

use super::test_utils::{TestProject, UppercaseCompiler};

fn touch_later(path: &Path, secs: u64) {
    let file = fs::OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(secs))
        .unwrap();
}

#[test]
fn test_unchanged_sources_are_not_recompiled() {
    let project = TestProject::new();
    let source = project.write("static/css/site.scss", "one");

    let mut watcher =
        AssetWatcher::for_project(&project.layout(), project.cache().clone(), UppercaseCompiler);
    assert_eq!(watcher.scan().compiled, 1);

    let again = watcher.scan();
    assert_eq!(again.compiled, 0);
    assert_eq!(again.unchanged, 1);

    fs::write(&source, "two").unwrap();
    touch_later(&source, 5);
    assert_eq!(watcher.scan().compiled, 1);

    let asset = project.cache().get(&source).unwrap();
    assert_eq!(&asset.data[..], b"TWO");
}

#[test]
fn test_failure_retried_only_after_edit() {
    let project = TestProject::new();
    let source = project.write("static/js/app.coffee", "BROKEN");

    let mut watcher =
        AssetWatcher::for_project(&project.layout(), project.cache().clone(), UppercaseCompiler);
    assert_eq!(watcher.scan().failed, 1);

    // same mtime: the failure is remembered
    let again = watcher.scan();
    assert_eq!(again.failed, 0);
    assert_eq!(again.compiled, 0);

    fs::write(&source, "fixed").unwrap();
    touch_later(&source, 5);
    let fixed = watcher.scan();
    assert_eq!(fixed.compiled, 1);
    assert!(project.cache().get(&source).is_some());
}

#[test]
fn test_sources_outside_their_directory_are_ignored() {
    let project = TestProject::new();
    project.write("static/js/style.scss", "wrong place");
    project.write("static/css/app.coffee", "wrong place");
    project.write("static/css/.draft.scss", "hidden");
    project.write("static/img/other.less", "not watched");

    let mut watcher =
        AssetWatcher::for_project(&project.layout(), project.cache().clone(), UppercaseCompiler);
    let report = watcher.scan();
    assert_eq!(report.compiled, 0);
    assert!(project.cache().is_empty());
}

#[test]
fn test_spawned_watcher_picks_up_new_files() {
    let project = TestProject::new();
    fs::create_dir_all(project.layout().stylesheet_dir()).unwrap();

    let watcher =
        AssetWatcher::for_project(&project.layout(), project.cache().clone(), UppercaseCompiler)
            .with_interval(Duration::from_millis(20));
    let _handle = watcher.spawn().unwrap();

    let source = project.write("static/css/late.styl", "late");

    let deadline = Instant::now() + Duration::from_secs(5);
    while project.cache().get(&source).is_none() {
        assert!(Instant::now() < deadline, "watcher never compiled the file");
        thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(&project.cache().get(&source).unwrap().data[..], b"LATE");
}

#[cfg(unix)]
#[test]
fn test_external_compilers() {
    let project = TestProject::new();
    let less = project.write("static/css/theme.less", "a { b: c }");
    let styl = project.write("static/css/print.styl", "body\n  color red\n");
    let coffee = project.write("static/js/app.coffee", "alert 1");
    let plain = project.write("static/js/vendor.js", "var x = 1;");

    // `cat FILE` and `cat < FILE` stand in for lessc and stylus
    let commands = CompilerCommands {
        lessc: "cat".to_string(),
        stylus: "cat".to_string(),
        coffee: "false".to_string(),
        ..CompilerCommands::default()
    };
    let mut watcher = AssetWatcher::for_project(
        &project.layout(),
        project.cache().clone(),
        ExternalCompiler::new(commands),
    );

    let report = watcher.scan();
    assert_eq!(report.compiled, 3);
    assert_eq!(report.failed, 1);

    let cache = project.cache();
    assert_eq!(&cache.get(&less).unwrap().data[..], b"a { b: c }");
    assert_eq!(&cache.get(&styl).unwrap().data[..], b"body\n  color red\n");
    assert_eq!(&cache.get(&plain).unwrap().data[..], b"var x = 1;");
    assert!(cache.get(&coffee).is_none());
}

#[cfg(unix)]
#[test]
fn test_missing_compiler_program() {
    let project = TestProject::new();
    project.write("static/css/site.scss", "a {}");

    let commands = CompilerCommands {
        sass: "hive-test-no-such-compiler".to_string(),
        ..CompilerCommands::default()
    };
    let mut watcher = AssetWatcher::for_project(
        &project.layout(),
        project.cache().clone(),
        ExternalCompiler::new(commands),
    );

    let report = watcher.scan();
    assert_eq!(report.failed, 1);
    assert!(project.cache().is_empty());
}
