use std::path::PathBuf;

use super::current_user;
use crate::app::{App, AppError};
use crate::config::Config;

fn unique_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::now_v7()));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn open_app(root: &std::path::Path) -> App {
    let db_path = root.join("networking.sqlite");
    App::open(db_path.to_str().expect("utf8 path"), Config::default()).expect("app should open")
}

#[test]
fn current_user_requires_a_selection() {
    let root = unique_dir("networking-main-none");
    let app = open_app(&root);
    let err = current_user(&app, None).expect_err("missing user should fail");
    assert!(matches!(err, AppError::InvalidArgument(_)));
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn current_user_resolves_case_insensitive_email() {
    let root = unique_dir("networking-main-user");
    let app = open_app(&root);
    let user = app
        .ensure_user("owner@example.com", Some("Owner"))
        .expect("user should be created");

    let resolved = current_user(&app, Some("  Owner@Example.com ")).expect("user should resolve");
    assert_eq!(resolved, user.id);

    let err = current_user(&app, Some("stranger@example.com")).expect_err("unknown user");
    assert!(matches!(err, AppError::NotFound(_)));
    let _ = std::fs::remove_dir_all(root);
}
