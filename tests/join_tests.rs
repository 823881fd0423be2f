// tests/join_tests.rs

use recql::{Engine, InMemorySource, QueryError, Record, Value, records_to_json};
use serde_json::json;

fn engine() -> Engine {
    Engine::new(
        InMemorySource::new()
            .with_json("lhs", json!([{"id": 1}]))
            .with_json("rhs", json!([{"id": 1, "v": "x"}, {"id": 2, "v": "y"}]))
            .with_json("left", json!([{"id": 1}, {"id": 3}]))
            .with_json("right", json!([{"id": 1, "v": "x"}]))
            .with_json(
                "users",
                json!([
                    {"id": 1, "name": "Ada"},
                    {"id": 2, "name": "Grace"},
                    {"id": 3, "name": "Linus"},
                ]),
            )
            .with_json(
                "admins",
                json!([
                    {"id": 2, "level": "root"},
                    {"id": 4, "level": "ops"},
                ]),
            )
            .with_json(
                "orders",
                json!([
                    {"id": 10, "user_id": 1, "total": 50},
                    {"id": 11, "user_id": 1, "total": 150},
                    {"id": 12, "user_id": 2, "total": 250},
                    {"id": 13, "user_id": 1, "total": 100},
                ]),
            ),
    )
}

fn rows(sql: &str) -> Vec<Record> {
    match engine().run_query(sql) {
        Ok(rows) => rows,
        Err(e) => panic!("query {:?} failed: {}", sql, e),
    }
}

fn run(sql: &str) -> String {
    records_to_json(&rows(sql))
}

#[test]
fn test_left_join_single_match() {
    let result = rows("SELECT * FROM lhs LEFT JOIN rhs ON lhs.id = rhs.id");
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].get("lhs.id"), Some(&Value::Integer(1)));
    assert_eq!(result[0].get("rhs.v"), Some(&Value::from("x")));
}

#[test]
fn test_keyword_table_names_are_quoted() {
    assert_eq!(
        run("SELECT l.id, r.v FROM 'left' l LEFT JOIN 'right' r ON l.id = r.id"),
        r#"[{"l.id":1,"r.v":"x"},{"l.id":3,"r.v":null}]"#
    );

    let err = engine()
        .run_query("SELECT * FROM left LEFT JOIN right ON left.id = right.id")
        .unwrap_err();
    assert!(matches!(err, QueryError::Syntax(_)), "got {:?}", err);
}

#[test]
fn test_inner_join_with_aliases() {
    assert_eq!(
        run("SELECT u.name, o.total FROM users u JOIN orders o ON o.user_id = u.id"),
        concat!(
            r#"[{"u.name":"Ada","o.total":50},{"u.name":"Ada","o.total":150},"#,
            r#"{"u.name":"Ada","o.total":100},{"u.name":"Grace","o.total":250}]"#
        )
    );
}

#[test]
fn test_left_join_null_extends() {
    let result = rows(
        "SELECT u.name, o.total FROM users u LEFT JOIN orders o ON o.user_id = u.id",
    );
    assert_eq!(result.len(), 5);
    let linus = &result[4];
    assert_eq!(linus.get("u.name"), Some(&Value::from("Linus")));
    assert_eq!(linus.get("o.total"), Some(&Value::Null));
}

#[test]
fn test_right_join_null_extends_left() {
    let result = rows("SELECT * FROM orders o RIGHT JOIN users u ON o.user_id = u.id");
    assert_eq!(result.len(), 5);
    let linus = result
        .iter()
        .find(|r| r.get("u.name") == Some(&Value::from("Linus")))
        .expect("unmatched right row is kept");
    assert_eq!(linus.get("o.id"), Some(&Value::Null));
    assert_eq!(linus.get("o.total"), Some(&Value::Null));
}

#[test]
fn test_full_join() {
    assert_eq!(
        run("SELECT u.name, a.level FROM users u FULL OUTER JOIN admins a ON a.id = u.id"),
        concat!(
            r#"[{"u.name":"Ada","a.level":null},{"u.name":"Grace","a.level":"root"},"#,
            r#"{"u.name":"Linus","a.level":null},{"u.name":null,"a.level":"ops"}]"#
        )
    );
}

#[test]
fn test_cross_join_ignores_on() {
    assert_eq!(rows("SELECT * FROM users CROSS JOIN admins").len(), 6);
    assert_eq!(
        rows("SELECT * FROM users u CROSS JOIN admins a ON a.id = 999").len(),
        6
    );
}

#[test]
fn test_non_boolean_on_never_matches() {
    assert!(rows("SELECT * FROM users u JOIN admins a ON a.level").is_empty());
    assert_eq!(
        rows("SELECT * FROM users u LEFT JOIN admins a ON a.level").len(),
        3
    );
}

#[test]
fn test_chained_joins() {
    assert_eq!(
        run("SELECT u.name, o.total, a.level FROM users u \
             JOIN orders o ON o.user_id = u.id \
             JOIN admins a ON a.id = u.id"),
        r#"[{"u.name":"Grace","o.total":250,"a.level":"root"}]"#
    );
}

#[test]
fn test_unaliased_tables_use_their_names() {
    assert_eq!(
        run("SELECT users.name, orders.total FROM users JOIN orders ON orders.user_id = users.id \
             WHERE orders.total > 100"),
        r#"[{"users.name":"Ada","orders.total":150},{"users.name":"Grace","orders.total":250}]"#
    );
}

#[test]
fn test_unqualified_names_after_join() {
    // `level` only exists on one side, so it resolves without a qualifier
    assert_eq!(
        run("SELECT name, level FROM users u JOIN admins a ON a.id = u.id"),
        r#"[{"name":"Grace","level":"root"}]"#
    );
}

#[test]
fn test_join_then_filter_and_order() {
    assert_eq!(
        run("SELECT u.name, o.total FROM users u JOIN orders o ON o.user_id = u.id \
             WHERE o.total >= 100 ORDER BY o.total DESC"),
        concat!(
            r#"[{"u.name":"Grace","o.total":250},{"u.name":"Ada","o.total":150},"#,
            r#"{"u.name":"Ada","o.total":100}]"#
        )
    );
}

#[test]
fn test_group_over_join() {
    assert_eq!(
        run("SELECT u.name, COUNT(*) AS n, SUM(o.total) AS spent FROM users u \
             LEFT JOIN orders o ON o.user_id = u.id GROUP BY u.name"),
        concat!(
            r#"[{"u.name":"Ada","n":3,"spent":300},{"u.name":"Grace","n":1,"spent":250},"#,
            r#"{"u.name":"Linus","n":1,"spent":0}]"#
        )
    );
}
