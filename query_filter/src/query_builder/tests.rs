use crate::errors::FilterError;
use crate::query_builder::{
    compile, compile_strict, ColumnAdjustment, FilterOperator, FilterTerm, Predicate,
    QueryBuilder, SortOrder, SqlGenerator,
};
use crate::validation::{ValidatedFieldName, ValidatedTableName};
use serde_json::{json, Map, Value};

fn filter_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

fn inline(predicates: &[Predicate]) -> Vec<String> {
    let mut rendered: Vec<String> = predicates.iter().map(Predicate::to_inline_sql).collect();
    rendered.sort();
    rendered
}

fn table(name: &str) -> ValidatedTableName {
    ValidatedTableName::new(name).unwrap()
}

fn field(name: &str) -> ValidatedFieldName {
    ValidatedFieldName::new(name).unwrap()
}

// ========================================
// Map compiler
// ========================================

#[test]
fn test_compile_range_and_like() {
    let filters = filter_map(json!({ "age:ge": 18, "name:lk": "ann" }));
    let predicates = compile(&filters);

    assert_eq!(
        inline(&predicates),
        vec!["`age` >= 18".to_string(), "`name` LIKE '%ann%'".to_string()]
    );

    let name = predicates
        .iter()
        .find(|p| p.clause().contains("LIKE"))
        .unwrap();
    assert_eq!(name.clause(), "`name` LIKE ?");
    assert_eq!(name.params(), &[json!("%ann%")]);
}

#[test]
fn test_compile_without_operator_means_equality() {
    let filters = filter_map(json!({ "status": "active" }));
    let predicates = compile(&filters);

    assert_eq!(predicates.len(), 1);
    assert_eq!(predicates[0].clause(), "`status` = ?");
    assert_eq!(predicates[0].to_inline_sql(), "`status` = 'active'");
}

#[test]
fn test_compile_in_list() {
    let filters = filter_map(json!({ "id:in": [1, 2, 3] }));
    let predicates = compile(&filters);

    assert_eq!(predicates.len(), 1);
    assert_eq!(predicates[0].clause(), "`id` IN (?, ?, ?)");
    assert_eq!(predicates[0].params(), &[json!(1), json!(2), json!(3)]);
    assert_eq!(predicates[0].to_inline_sql(), "`id` IN (1, 2, 3)");
}

#[test]
fn test_compile_like_with_non_string_is_skipped() {
    let filters = filter_map(json!({ "id:lk": 5 }));
    assert!(compile(&filters).is_empty());

    // the entry is skipped, not rejected, even in strict mode
    assert_eq!(compile_strict(&filters).unwrap(), Vec::new());

    let filters = filter_map(json!({ "id:lk": 5, "status": 1 }));
    assert_eq!(inline(&compile(&filters)), vec!["`status` = 1".to_string()]);
}

#[test]
fn test_compile_every_comparison() {
    let filters = filter_map(json!({
        "a:eq": 1,
        "b:ne": 2,
        "c:gt": 3,
        "d:ge": 4,
        "e:lt": 5,
        "f:le": 6,
    }));

    assert_eq!(
        inline(&compile(&filters)),
        vec![
            "`a` = 1".to_string(),
            "`b` <> 2".to_string(),
            "`c` > 3".to_string(),
            "`d` >= 4".to_string(),
            "`e` < 5".to_string(),
            "`f` <= 6".to_string(),
        ]
    );
}

#[test]
fn test_compile_null_comparisons() {
    let filters = filter_map(json!({ "deleted_at": null, "email:ne": null }));
    let predicates = compile(&filters);

    assert_eq!(
        inline(&predicates),
        vec![
            "`deleted_at` IS NULL".to_string(),
            "`email` IS NOT NULL".to_string()
        ]
    );
    assert!(predicates.iter().all(|p| p.params().is_empty()));
}

#[test]
fn test_compile_membership_edge_cases() {
    let filters = filter_map(json!({ "id:in": [] }));
    assert_eq!(inline(&compile(&filters)), vec!["1=0".to_string()]);

    let filters = filter_map(json!({ "id:ni": [] }));
    assert_eq!(inline(&compile(&filters)), vec!["1=1".to_string()]);

    let filters = filter_map(json!({ "id:in": 7 }));
    assert_eq!(inline(&compile(&filters)), vec!["`id` IN (7)".to_string()]);

    let filters = filter_map(json!({ "kind:ni": ["a", "b"] }));
    assert_eq!(
        inline(&compile(&filters)),
        vec!["`kind` NOT IN ('a', 'b')".to_string()]
    );
}

#[test]
fn test_compile_find_in_set() {
    let filters = filter_map(json!({ "tags:fi": "news" }));
    let predicates = compile(&filters);

    assert_eq!(predicates[0].clause(), "FIND_IN_SET(?, `tags`)");
    assert_eq!(predicates[0].to_inline_sql(), "FIND_IN_SET('news', `tags`)");
}

#[test]
fn test_compile_drops_unusable_entries() {
    let filters = filter_map(json!({
        "age:between": [1, 2],
        "a:b:c": 1,
        "name; DROP TABLE users": "x",
        "ok": true,
    }));

    assert_eq!(
        inline(&compile(&filters)),
        vec!["`a` = 1".to_string(), "`ok` = TRUE".to_string()]
    );
}

#[test]
fn test_compile_reads_extra_separators_as_equality() {
    let filters = filter_map(json!({ "status:eq:x": "active" }));
    let predicates = compile(&filters);

    assert_eq!(predicates.len(), 1);
    assert_eq!(predicates[0].clause(), "`status` = ?");
    assert_eq!(predicates[0].params(), &[json!("active")]);

    let term = FilterTerm::parse_lenient("views:gt:0", json!(3)).unwrap();
    assert_eq!(term.operator(), FilterOperator::Eq);
    assert_eq!(term.field().as_str(), "views");
    assert_eq!(
        FilterTerm::parse("views:gt:0", json!(3)),
        Err(FilterError::MalformedKey("views:gt:0".to_string()))
    );
}

#[test]
fn test_compile_strict_reports_bad_entries() {
    let filters = filter_map(json!({ "age:between": [1, 2] }));
    assert_eq!(
        compile_strict(&filters),
        Err(FilterError::UnknownOperator {
            key: "age:between".to_string(),
            tag: "between".to_string()
        })
    );

    let filters = filter_map(json!({ "a:eq:1": 1 }));
    assert_eq!(
        compile_strict(&filters),
        Err(FilterError::MalformedKey("a:eq:1".to_string()))
    );

    let filters = filter_map(json!({ "1abc": 1 }));
    assert!(matches!(
        compile_strict(&filters),
        Err(FilterError::InvalidIdentifier(_))
    ));
}

#[test]
fn test_empty_map_compiles_to_nothing() {
    assert!(compile(&Map::new()).is_empty());
}

#[test]
fn test_values_are_never_spliced_into_clauses() {
    let filters = filter_map(json!({ "name": "'; DROP TABLE users; --" }));
    let predicates = compile(&filters);

    assert_eq!(predicates[0].clause(), "`name` = ?");
    assert_eq!(
        predicates[0].to_inline_sql(),
        "`name` = '''; DROP TABLE users; --'"
    );
}

// ========================================
// Typed terms
// ========================================

#[test]
fn test_operator_tags_round_trip() {
    for op in FilterOperator::ALL {
        assert_eq!(FilterOperator::from_tag(op.tag()), Some(op));
        assert_eq!(op.to_string().parse::<FilterOperator>().unwrap(), op);
    }
    assert!("between".parse::<FilterOperator>().is_err());
}

#[test]
fn test_term_parse() {
    let term = FilterTerm::parse("u.age:gt", json!(30)).unwrap();
    assert_eq!(term.field().as_str(), "u.age");
    assert_eq!(term.operator(), FilterOperator::Gt);
    assert_eq!(term.value(), &json!(30));

    let term = FilterTerm::parse("status", json!("on")).unwrap();
    assert_eq!(term.operator(), FilterOperator::Eq);

    assert!(FilterTerm::parse("status:", json!("on")).is_err());
}

#[test]
fn test_term_helpers() {
    let predicate = FilterTerm::like("title", "rust").unwrap().to_predicate().unwrap();
    assert_eq!(predicate.to_inline_sql(), "`title` LIKE '%rust%'");

    let predicate = FilterTerm::in_values("id", vec![json!(1), json!(2)])
        .unwrap()
        .to_predicate()
        .unwrap();
    assert_eq!(predicate.to_inline_sql(), "`id` IN (1, 2)");

    let predicate = FilterTerm::le("u.score", json!(9.5))
        .unwrap()
        .to_predicate()
        .unwrap();
    assert_eq!(predicate.to_inline_sql(), "`u`.`score` <= 9.5");

    assert!(FilterTerm::eq("bad name", json!(1)).is_err());
}

// ========================================
// SQL generation
// ========================================

#[test]
fn test_limit_clause() {
    assert_eq!(SqlGenerator::build_limit_clause(None, None), "");
    assert_eq!(SqlGenerator::build_limit_clause(Some(10), None), "LIMIT 10");
    assert_eq!(
        SqlGenerator::build_limit_clause(Some(10), Some(20)),
        "LIMIT 10 OFFSET 20"
    );
    assert_eq!(
        SqlGenerator::build_limit_clause(None, Some(5)),
        "LIMIT 18446744073709551615 OFFSET 5"
    );
}

#[test]
fn test_insert_statement() {
    let data = filter_map(json!({ "name": "ann", "age": 30 }));
    let (sql, values) = SqlGenerator::build_insert(&table("users"), &data).unwrap();

    // serde_json maps iterate in key order
    assert_eq!(sql, "INSERT INTO `users` (`age`, `name`) VALUES (?, ?)");
    assert_eq!(values, vec![json!(30), json!("ann")]);

    assert_eq!(
        SqlGenerator::build_insert(&table("users"), &Map::new()),
        Err(FilterError::NoColumns)
    );

    let data = filter_map(json!({ "bad col": 1 }));
    assert!(SqlGenerator::build_insert(&table("users"), &data).is_err());
}

#[test]
fn test_select_with_everything() {
    let query = QueryBuilder::new(table("shop_order"))
        .select(vec![field("id"), field("total")])
        .filters(&filter_map(json!({ "status": "paid" })))
        .order_by(field("id"), SortOrder::Desc)
        .limit(10)
        .offset(20);

    let (sql, values) = query.build_select();
    assert_eq!(
        sql,
        "SELECT `id`, `total` FROM `shop_order` WHERE `status` = ? ORDER BY `id` DESC LIMIT 10 OFFSET 20"
    );
    assert_eq!(values, vec![json!("paid")]);
}

#[test]
fn test_select_without_conditions() {
    let (sql, values) = QueryBuilder::new(table("users")).build_select();
    assert_eq!(sql, "SELECT * FROM `users`");
    assert!(values.is_empty());
}

#[test]
fn test_select_one_and_count() {
    let query = QueryBuilder::new(table("users"))
        .filter(FilterTerm::ge("age", json!(18)).unwrap())
        .order_by(field("name"), SortOrder::Asc)
        .limit(50)
        .with_count(true);

    let (sql, _) = query.build_select_one();
    assert_eq!(
        sql,
        "SELECT * FROM `users` WHERE `age` >= ? ORDER BY `name` ASC LIMIT 1"
    );

    let (sql, values) = query.build_count();
    assert_eq!(sql, "SELECT COUNT(*) AS total FROM `users` WHERE `age` >= ?");
    assert_eq!(values, vec![json!(18)]);
    assert!(query.wants_count());
}

#[test]
fn test_update_binds_set_values_first() {
    let query = QueryBuilder::new(table("users"))
        .filters(&filter_map(json!({ "id": 7 })));
    let (sql, values) = query
        .build_update(&filter_map(json!({ "name": "bob" })))
        .unwrap();

    assert_eq!(sql, "UPDATE `users` SET `name` = ? WHERE `id` = ?");
    assert_eq!(values, vec![json!("bob"), json!(7)]);

    assert_eq!(query.build_update(&Map::new()), Err(FilterError::NoColumns));
}

#[test]
fn test_increment_and_decrement() {
    let query = QueryBuilder::new(table("posts"))
        .filters(&filter_map(json!({ "id:in": [1, 2] })));

    let (sql, values) = query.build_adjust(&field("views"), ColumnAdjustment::Increment, json!(1));
    assert_eq!(
        sql,
        "UPDATE `posts` SET `views` = `views` + ? WHERE `id` IN (?, ?)"
    );
    assert_eq!(values, vec![json!(1), json!(1), json!(2)]);

    let (sql, _) = query.build_adjust(&field("stock"), ColumnAdjustment::Decrement, json!(3));
    assert!(sql.contains("`stock` = `stock` - ?"));
}

#[test]
fn test_raw_conditions_combine_with_filters() {
    let query = QueryBuilder::new(table("users"))
        .where_raw("created_at > NOW() - INTERVAL ? DAY", vec![json!(7)])
        .filter(FilterTerm::eq("active", json!(true)).unwrap());

    let (where_clause, values) = query.build_where_clause();
    assert_eq!(
        where_clause,
        "WHERE created_at > NOW() - INTERVAL ? DAY AND `active` = ?"
    );
    assert_eq!(values, vec![json!(7), json!(true)]);
}

#[test]
fn test_strict_filters_on_builder() {
    let result = QueryBuilder::new(table("users"))
        .filters_strict(&filter_map(json!({ "age:between": 1 })));
    assert!(result.is_err());

    let query = QueryBuilder::new(table("users"))
        .filters_strict(&filter_map(json!({ "age:lt": 65 })))
        .unwrap();
    assert_eq!(query.conditions().len(), 1);
}
