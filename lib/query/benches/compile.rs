#![allow(clippy::unwrap_used, reason = "Benchmarks")]

use codspeed_criterion_compat::{criterion_group, criterion_main, Criterion};
use rdf_entity_model::{
    Condition, ConditionGroup, ConditionNode, Operator, Paging, SortDirection, SortKey,
};
use rdf_entity_query::{ConditionCompiler, QueryBuilder};
use rdf_entity_schema::Schema;
use std::hint::black_box;

fn schema() -> Schema {
    Schema::from_json(include_str!("../../schema/testdata/fruit.json"), 1).unwrap()
}

/// A tree with nested OR groups, ambiguous mappings and language restrictions.
fn complex_tree() -> ConditionNode {
    ConditionGroup::and()
        .condition(Condition::new("type", ["fruit", "vegetable"], Operator::In))
        .group(
            ConditionGroup::or()
                .condition(Condition::new("label", "apple", Operator::Contains).with_language("en"))
                .condition(Condition::new("color", "http://example.com/red", Operator::Eq))
                .group(
                    ConditionGroup::and()
                        .condition(Condition::new("weight", ["10", "20"], Operator::Between))
                        .condition(Condition::new("created", 1_483_228_800_i64, Operator::Gt)),
                ),
        )
        .condition(Condition::new("text", "%p%", Operator::NotLike))
        .into()
}

/// These benchmarks measure compiling condition trees into group graph patterns.
fn compile_conditions(c: &mut Criterion) {
    let schema = schema();
    let definition = schema.entity_type("rdf_entity").unwrap();

    c.bench_function("ConditionCompiler::compile - Single id condition", |b| {
        let tree = Condition::new("id", "http://fruit.example.com/001", Operator::Eq).into();
        b.iter(|| black_box(ConditionCompiler::new(definition).compile(&tree).unwrap()));
    });

    c.bench_function("ConditionCompiler::compile - Nested groups", |b| {
        let tree = complex_tree();
        b.iter(|| black_box(ConditionCompiler::new(definition).compile(&tree).unwrap()));
    });
}

/// These benchmarks measure building and rendering complete queries.
fn build_queries(c: &mut Criterion) {
    let schema = schema();
    let definition = schema.entity_type("rdf_entity").unwrap();
    let sorts = [
        SortKey::new("id", SortDirection::Ascending),
        SortKey::new("color", SortDirection::Descending),
    ];

    c.bench_function("QueryBuilder::build - Select with sort and paging", |b| {
        let tree = complex_tree();
        b.iter(|| {
            let query = QueryBuilder::new(definition)
                .build(&tree, &sorts, Some(Paging::range(0, 50)), false, None)
                .unwrap();
            black_box(query.to_string())
        });
    });

    c.bench_function("QueryBuilder::build - Count", |b| {
        let tree = complex_tree();
        b.iter(|| {
            let query = QueryBuilder::new(definition)
                .build(&tree, &[], None, true, None)
                .unwrap();
            black_box(query.to_string())
        });
    });
}

criterion_group!(compile, compile_conditions, build_queries);
criterion_main!(compile);
