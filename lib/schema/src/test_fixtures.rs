use crate::Schema;

pub const FRUIT_SCHEMA: &str = include_str!("../testdata/fruit.json");

pub fn fruit_schema() -> Schema {
    Schema::from_json(FRUIT_SCHEMA, 1).unwrap()
}
