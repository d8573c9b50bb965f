//! Unit tests for container run assembly and process draining.
