use todograph_core::db::open_db_in_memory;
use todograph_core::{
    NewTodo, RepoError, SqliteTodoRepository, TodoRepository, TodoValidationError,
};

const NOW: i64 = 1_700_000_000_000;

#[test]
fn create_and_get_roundtrip() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteTodoRepository::try_new(&mut conn).unwrap();

    let id = repo
        .create_todo(&NewTodo::new("  write report ").due_at(NOW + 10), Some("a.jpg"), NOW)
        .unwrap();

    let loaded = repo.get_todo(id).unwrap().unwrap();
    assert_eq!(loaded.id, id);
    assert_eq!(loaded.title, "write report");
    assert_eq!(loaded.due_at, Some(NOW + 10));
    assert_eq!(loaded.image_url.as_deref(), Some("a.jpg"));
    assert_eq!(loaded.created_at, NOW);
    assert!(loaded.dependencies.is_empty());
}

#[test]
fn get_missing_returns_none() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteTodoRepository::try_new(&mut conn).unwrap();
    assert!(repo.get_todo(42).unwrap().is_none());
}

#[test]
fn dependencies_are_stored_and_resolved() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteTodoRepository::try_new(&mut conn).unwrap();

    let c = repo.create_todo(&NewTodo::new("c"), None, NOW).unwrap();
    let b = repo.create_todo(&NewTodo::new("b"), None, NOW).unwrap();
    let a = repo
        .create_todo(&NewTodo::new("a").depends_on([c, b]), None, NOW)
        .unwrap();

    let loaded = repo.get_todo(a).unwrap().unwrap();
    assert_eq!(loaded.dependencies, vec![c, b]);

    let refs = repo.list_dependency_refs(a).unwrap();
    let titles: Vec<&str> = refs.iter().map(|dep| dep.title.as_str()).collect();
    assert_eq!(titles, vec!["c", "b"]);
}

#[test]
fn unknown_dependency_rejects_without_persisting() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteTodoRepository::try_new(&mut conn).unwrap();
    repo.create_todo(&NewTodo::new("existing"), None, NOW).unwrap();

    let err = repo
        .create_todo(&NewTodo::new("orphan").depends_on([77]), None, NOW)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(TodoValidationError::UnknownDependency(77))
    ));
    assert_eq!(repo.list_todos().unwrap().len(), 1);
}

#[test]
fn self_reference_to_assigned_id_rolls_back() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteTodoRepository::try_new(&mut conn).unwrap();
    let first = repo.create_todo(&NewTodo::new("first"), None, NOW).unwrap();

    // AUTOINCREMENT assigns the next id, so this names the row being created.
    let next = first + 1;
    let err = repo
        .create_todo(&NewTodo::new("selfish").depends_on([next]), None, NOW)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(TodoValidationError::SelfDependency(id)) if id == next
    ));
    assert!(repo.get_todo(next).unwrap().is_none());
    assert_eq!(repo.list_todos().unwrap().len(), 1);
}

#[test]
fn empty_title_is_rejected_before_insert() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteTodoRepository::try_new(&mut conn).unwrap();

    let err = repo.create_todo(&NewTodo::new("  "), None, NOW).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(TodoValidationError::EmptyTitle)
    ));
    assert!(repo.list_todos().unwrap().is_empty());
}

#[test]
fn list_is_newest_first() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteTodoRepository::try_new(&mut conn).unwrap();

    let old = repo.create_todo(&NewTodo::new("old"), None, NOW).unwrap();
    let new = repo.create_todo(&NewTodo::new("new"), None, NOW + 1).unwrap();
    let same_time = repo.create_todo(&NewTodo::new("tie"), None, NOW + 1).unwrap();

    let ids: Vec<i64> = repo.list_todos().unwrap().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![same_time, new, old]);
}

#[test]
fn delete_leaves_dangling_reference() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteTodoRepository::try_new(&mut conn).unwrap();

    let b = repo.create_todo(&NewTodo::new("b"), None, NOW).unwrap();
    let a = repo
        .create_todo(&NewTodo::new("a").depends_on([b]), None, NOW)
        .unwrap();
    repo.delete_todo(b).unwrap();

    let loaded = repo.get_todo(a).unwrap().unwrap();
    assert_eq!(loaded.dependencies, vec![b]);
    assert!(repo.list_dependency_refs(a).unwrap().is_empty());

    let err = repo.delete_todo(b).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == b));
}

#[test]
fn replace_dependencies_rejects_cycle_and_keeps_old_edges() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteTodoRepository::try_new(&mut conn).unwrap();

    let a = repo.create_todo(&NewTodo::new("a"), None, NOW).unwrap();
    let b = repo
        .create_todo(&NewTodo::new("b").depends_on([a]), None, NOW)
        .unwrap();
    let c = repo.create_todo(&NewTodo::new("c"), None, NOW).unwrap();
    repo.replace_dependencies(a, &[c]).unwrap();

    let err = repo.replace_dependencies(a, &[c, b]).unwrap_err();
    match err {
        RepoError::Validation(TodoValidationError::CyclicDependency(path)) => {
            assert_eq!(path, vec![a, b, a]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(repo.get_todo(a).unwrap().unwrap().dependencies, vec![c]);
}

#[test]
fn replace_dependencies_on_missing_task_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteTodoRepository::try_new(&mut conn).unwrap();
    let err = repo.replace_dependencies(5, &[]).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(5)));
}

#[test]
fn snapshot_exposes_invalid_rows_instead_of_masking_them() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute_batch("INSERT INTO todos (id, title) VALUES (1, '   ');")
        .unwrap();
    let repo = SqliteTodoRepository::try_new(&mut conn).unwrap();

    let err = repo.load_snapshot().unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();
    assert!(matches!(
        SqliteTodoRepository::try_new(&mut conn),
        Err(RepoError::InvalidData(_))
    ));
}
