use rdf_entity_schema::Schema;

pub fn fruit_schema() -> Schema {
    Schema::from_json(include_str!("../../schema/testdata/fruit.json"), 1).unwrap()
}
