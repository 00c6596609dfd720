//! Builder pipelines compared with the documented examples under
//! `tests/fixtures`. No server needed.

mod common;

use common::{relaxed, Fixture, Game};
use tessera_mongodb::aggregation::expressions::{accumulator, array, comparison, conditional, document, field};
use tessera_mongodb::aggregation::stages::{group, match_, sort};
use tessera_mongodb::query::filters::eq;
use tessera_mongodb::{EncodeContext, Entity, Pipeline};

fn encode(pipeline: &Pipeline) -> serde_json::Value {
    let model = Game::model();
    let ctx = EncodeContext::new(&model, false);
    relaxed(pipeline.encode(&ctx).unwrap())
}

fn first_three_scores() -> tessera_mongodb::aggregation::expressions::Expression {
    accumulator::first_n(3, array::array(["$playerId", "$score"]))
}

#[test]
fn test_first_n_example1() {
    let pipeline = Pipeline::new()
        .stage(match_([eq("gameId", "G1")]))
        .stage(group().id(field("gameId")).field("firstThreeScores", first_three_scores()));
    assert_eq!(encode(&pipeline), Fixture::new("expressions", "firstN", 1).action());
}

#[test]
fn test_first_n_example2() {
    let pipeline = Pipeline::new()
        .stage(group().id(field("gameId")).field("playerId", first_three_scores()));
    assert_eq!(encode(&pipeline), Fixture::new("expressions", "firstN", 2).action());
}

#[test]
fn test_first_n_example3() {
    let pipeline = Pipeline::new()
        .stage(sort().descending("score"))
        .stage(group().id(field("gameId")).field("playerId", first_three_scores()));
    assert_eq!(encode(&pipeline), Fixture::new("expressions", "firstN", 3).action());
}

#[test]
fn test_first_n_example4() {
    let n = conditional::condition(comparison::eq(field("gameId"), "G2"), 1, 3);
    let pipeline = Pipeline::new().stage(
        group()
            .id(document().field("gameId", field("gameId")))
            .field("gamescores", accumulator::first_n(n, field("score"))),
    );
    assert_eq!(encode(&pipeline), Fixture::new("expressions", "firstN", 4).action());
}

#[test]
fn test_fixture_data_loads() {
    for example in 1..=4 {
        let fixture = Fixture::new("expressions", "firstN", example);
        assert_eq!(fixture.data().len(), 8);
        assert!(fixture.expected().is_array());
    }
}
