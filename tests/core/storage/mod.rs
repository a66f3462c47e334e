//! Storage tests: snapshot persistence and failure isolation

mod test_persistence;
