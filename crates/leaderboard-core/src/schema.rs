//! Database bootstrap plan for the evaluation pipeline
//!
//! The leaderboard never talks to the database itself. The pipeline that
//! produces benchmark results expects a set of collections, indexes, an
//! application user and (in development) a single-member replica set. This
//! module describes that layout declaratively and renders it to a `mongosh`
//! script that is safe to run more than once.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;

/// One field of an index, `1` ascending or `-1` descending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexKey {
    pub field: String,
    pub direction: i32,
}

impl IndexKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub keys: Vec<IndexKey>,
    #[serde(default)]
    pub unique: bool,
}

impl IndexSpec {
    /// Non-unique index ascending on every field
    pub fn ascending(fields: &[&str]) -> Self {
        Self {
            keys: fields.iter().map(|f| IndexKey::asc(*f)).collect(),
            unique: false,
        }
    }

    /// Mark the index unique
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indexes: Vec::new(),
        }
    }

    pub fn with_index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }
}

/// Application user whose credentials are read from the environment of the
/// process running the script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSpec {
    pub username_env: String,
    pub password_env: String,
    pub database_env: String,
    pub role: String,
}

impl Default for UserSpec {
    fn default() -> Self {
        Self {
            username_env: "MONGO_INITDB_ROOT_USERNAME".to_string(),
            password_env: "MONGO_INITDB_ROOT_PASSWORD".to_string(),
            database_env: "MONGO_INITDB_DATABASE".to_string(),
            role: "readWrite".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaSetSpec {
    pub id: String,
    pub members: Vec<String>,
}

impl ReplicaSetSpec {
    pub fn single(id: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            members: vec![host.into()],
        }
    }
}

/// Everything the pipeline needs to exist before it starts writing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapPlan {
    pub database: String,
    pub collections: Vec<CollectionSpec>,
    pub app_user: Option<UserSpec>,
    pub replica_set: Option<ReplicaSetSpec>,
}

impl BootstrapPlan {
    /// Layout used by the benchmark pipeline
    pub fn testbench(database: impl Into<String>) -> Self {
        let task_identity = [
            "tasks",
            "framework",
            "requester_args.address",
            "requester_args.service",
            "done",
            "evaluated",
            "drop",
        ];
        let buffer_identity = ["task_data.node_id", "task_data.framework", "task_data.task"];

        Self {
            database: database.into(),
            collections: vec![
                CollectionSpec::new("tokenizers")
                    .with_index(IndexSpec::ascending(&["hash"]).unique()),
                CollectionSpec::new("tasks").with_index(IndexSpec::ascending(&task_identity)),
                CollectionSpec::new("instances")
                    .with_index(IndexSpec::ascending(&["task_id", "done"])),
                CollectionSpec::new("prompts")
                    .with_index(IndexSpec::ascending(&["task_id", "instance_id", "done"])),
                CollectionSpec::new("responses").with_index(IndexSpec::ascending(&[
                    "task_id",
                    "instance_id",
                    "prompt_id",
                    "ok",
                ])),
                CollectionSpec::new("nodes")
                    .with_index(IndexSpec::ascending(&["address", "service"]).unique()),
                CollectionSpec::new("results")
                    .with_index(IndexSpec::ascending(&["results_data.task_id"]).unique()),
                CollectionSpec::new("buffers_numerical")
                    .with_index(IndexSpec::ascending(&buffer_identity).unique()),
                CollectionSpec::new("buffers_signatures")
                    .with_index(IndexSpec::ascending(&buffer_identity).unique()),
            ],
            app_user: Some(UserSpec::default()),
            replica_set: None,
        }
    }

    pub fn with_replica_set(mut self, replica_set: ReplicaSetSpec) -> Self {
        self.replica_set = Some(replica_set);
        self
    }

    pub fn without_app_user(mut self) -> Self {
        self.app_user = None;
        self
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionSpec> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Check the plan is well-formed
    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(Error::schema("Database name cannot be empty"));
        }
        if let Some(c) = self
            .database
            .chars()
            .find(|c| matches!(c, '/' | '\\' | '.' | ' ' | '"' | '$'))
        {
            return Err(Error::schema(format!(
                "Database name '{}' contains invalid character '{}'",
                self.database, c
            )));
        }

        let mut names = HashSet::new();
        for collection in &self.collections {
            if collection.name.trim().is_empty() {
                return Err(Error::schema("Collection name cannot be empty"));
            }
            if collection.name.starts_with("system.") {
                return Err(Error::schema(format!(
                    "Collection name '{}' is reserved",
                    collection.name
                )));
            }
            if !names.insert(collection.name.as_str()) {
                return Err(Error::schema(format!(
                    "Duplicate collection '{}'",
                    collection.name
                )));
            }

            for index in &collection.indexes {
                if index.keys.is_empty() {
                    return Err(Error::schema(format!(
                        "Index on '{}' has no keys",
                        collection.name
                    )));
                }
                let mut fields = HashSet::new();
                for key in &index.keys {
                    if key.field.trim().is_empty() {
                        return Err(Error::schema(format!(
                            "Index on '{}' has an empty field name",
                            collection.name
                        )));
                    }
                    if key.direction != 1 && key.direction != -1 {
                        return Err(Error::schema(format!(
                            "Index key '{}' on '{}' has direction {}, expected 1 or -1",
                            key.field, collection.name, key.direction
                        )));
                    }
                    if !fields.insert(key.field.as_str()) {
                        return Err(Error::schema(format!(
                            "Index on '{}' repeats field '{}'",
                            collection.name, key.field
                        )));
                    }
                }
            }
        }

        if let Some(user) = &self.app_user {
            if user.username_env.is_empty()
                || user.password_env.is_empty()
                || user.database_env.is_empty()
            {
                return Err(Error::schema("App user environment variable names cannot be empty"));
            }
            if user.role.is_empty() {
                return Err(Error::schema("App user role cannot be empty"));
            }
        }

        if let Some(rs) = &self.replica_set {
            if rs.id.trim().is_empty() {
                return Err(Error::schema("Replica set id cannot be empty"));
            }
            if rs.members.is_empty() {
                return Err(Error::schema(format!(
                    "Replica set '{}' has no members",
                    rs.id
                )));
            }
        }

        Ok(())
    }

    /// Render an idempotent `mongosh` script
    pub fn render_mongosh(&self) -> Result<String> {
        self.validate()?;

        let mut script = String::new();
        let _ = writeln!(script, "// Database bootstrap for {}", self.database);
        let _ = writeln!(script, "// Safe to run repeatedly.");
        script.push('\n');

        if let Some(rs) = &self.replica_set {
            render_replica_set(&mut script, rs);
        }

        let _ = writeln!(script, "db = db.getSiblingDB({});", js_string(&self.database));
        script.push('\n');
        script.push_str("const existing = db.getCollectionNames();\n");
        script.push_str("function ensureCollection(name) {\n");
        script.push_str("    if (!existing.includes(name)) {\n");
        script.push_str("        db.createCollection(name);\n");
        script.push_str("        print(`created collection ${name}`);\n");
        script.push_str("    }\n");
        script.push_str("}\n");

        for collection in &self.collections {
            script.push('\n');
            let name = js_string(&collection.name);
            let _ = writeln!(script, "ensureCollection({});", name);
            for index in &collection.indexes {
                let keys = index
                    .keys
                    .iter()
                    .map(|k| format!("{}: {}", js_string(&k.field), k.direction))
                    .collect::<Vec<_>>()
                    .join(", ");
                if index.unique {
                    let _ = writeln!(
                        script,
                        "db.getCollection({}).createIndex({{{}}}, {{unique: true}});",
                        name, keys
                    );
                } else {
                    let _ = writeln!(script, "db.getCollection({}).createIndex({{{}}});", name, keys);
                }
            }
        }

        if let Some(user) = &self.app_user {
            script.push('\n');
            render_app_user(&mut script, user);
        }

        Ok(script)
    }
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn render_replica_set(script: &mut String, rs: &ReplicaSetSpec) {
    let members = rs
        .members
        .iter()
        .enumerate()
        .map(|(i, host)| format!("{{_id: {}, host: {}}}", i, js_string(host)))
        .collect::<Vec<_>>()
        .join(", ");

    script.push_str("try {\n");
    script.push_str("    rs.conf();\n");
    script.push_str("} catch (err) {\n");
    let _ = writeln!(script, "    print('initiating replica set {}');", rs.id);
    let _ = writeln!(
        script,
        "    rs.initiate({{_id: {}, version: 1, members: [{}]}});",
        js_string(&rs.id),
        members
    );
    script.push_str("    for (let i = 0; i < 100 && !db.hello().isWritablePrimary; i++) {\n");
    script.push_str("        sleep(100);\n");
    script.push_str("    }\n");
    script.push_str("}\n\n");
}

fn render_app_user(script: &mut String, user: &UserSpec) {
    let _ = writeln!(script, "const userName = process.env.{};", user.username_env);
    let _ = writeln!(script, "const password = process.env.{};", user.password_env);
    let _ = writeln!(script, "const userDb = process.env.{};", user.database_env);
    script.push_str("if (!userName || !password || !userDb) {\n");
    let _ = writeln!(
        script,
        "    print('{}, {} and {} must be set');",
        user.username_env, user.password_env, user.database_env
    );
    script.push_str("    quit(1);\n");
    script.push_str("}\n");
    script.push_str("const authDb = db.getSiblingDB(userDb);\n");
    script.push_str("if (authDb.getUser(userName) === null) {\n");
    let _ = writeln!(
        script,
        "    authDb.createUser({{user: userName, pwd: password, roles: [{{role: {}, db: userDb}}]}});",
        js_string(&user.role)
    );
    script.push_str("}\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_testbench_layout() {
        let plan = BootstrapPlan::testbench("pocket-ml-testbench");
        assert!(plan.validate().is_ok());
        assert_eq!(plan.collections.len(), 9);

        let nodes = plan.collection("nodes").unwrap();
        assert!(nodes.indexes[0].unique);
        assert_eq!(nodes.indexes[0].keys.len(), 2);

        let tasks = plan.collection("tasks").unwrap();
        assert!(!tasks.indexes[0].unique);
        assert_eq!(tasks.indexes[0].keys.len(), 7);

        // Each buffer collection carries its own unique index
        for name in ["buffers_numerical", "buffers_signatures"] {
            let collection = plan.collection(name).unwrap();
            assert_eq!(collection.indexes.len(), 1);
            assert!(collection.indexes[0].unique);
        }

        let results = plan.collection("results").unwrap();
        assert_eq!(results.indexes[0].keys[0].field, "results_data.task_id");
    }

    #[test]
    fn test_render_is_guarded() {
        let plan = BootstrapPlan::testbench("pocket-ml-testbench")
            .with_replica_set(ReplicaSetSpec::single("devRs", "mongodb:27017"));
        let script = plan.render_mongosh().unwrap();

        assert!(script.contains("db = db.getSiblingDB(\"pocket-ml-testbench\");"));
        assert!(script.contains("ensureCollection(\"buffers_signatures\");"));
        assert!(script.contains(
            "db.getCollection(\"results\").createIndex({\"results_data.task_id\": 1}, {unique: true});"
        ));
        assert!(script.contains("db.getCollection(\"instances\").createIndex({\"task_id\": 1, \"done\": 1});"));
        assert!(script.contains("if (authDb.getUser(userName) === null)"));
        assert!(script.contains("process.env.MONGO_INITDB_ROOT_PASSWORD"));
        assert!(script.contains("rs.conf();"));
        assert!(script.contains("{_id: 0, host: \"mongodb:27017\"}"));

        // Replica set comes before any writes
        let rs_at = script.find("rs.initiate").unwrap();
        let db_at = script.find("getSiblingDB").unwrap();
        assert!(rs_at < db_at);
    }

    #[test]
    fn test_render_without_optional_parts() {
        let script = BootstrapPlan::testbench("bench")
            .without_app_user()
            .render_mongosh()
            .unwrap();
        assert!(!script.contains("rs.initiate"));
        assert!(!script.contains("createUser"));
        assert!(!script.contains("process.env"));
    }

    #[test]
    fn test_validation_errors() {
        let mut plan = BootstrapPlan::testbench("bench");
        plan.collections.push(CollectionSpec::new("nodes"));
        assert!(matches!(plan.validate(), Err(Error::Schema(_))));

        let plan = BootstrapPlan {
            database: "bench".to_string(),
            collections: vec![CollectionSpec::new("empty").with_index(IndexSpec::ascending(&[]))],
            app_user: None,
            replica_set: None,
        };
        assert!(plan.validate().is_err());

        let mut plan = BootstrapPlan::testbench("bench");
        plan.collections[0].indexes[0].keys[0].direction = 2;
        assert!(plan.validate().is_err());

        assert!(BootstrapPlan::testbench("").validate().is_err());
        assert!(BootstrapPlan::testbench("my.db").validate().is_err());

        let plan = BootstrapPlan::testbench("bench").with_replica_set(ReplicaSetSpec {
            id: "rs0".to_string(),
            members: vec![],
        });
        assert!(plan.render_mongosh().is_err());
    }

    #[test]
    fn test_plan_serializes() {
        let plan = BootstrapPlan::testbench("bench");
        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["database"], "bench");
        assert_eq!(value["collections"][0]["name"], "tokenizers");
        assert_eq!(value["collections"][0]["indexes"][0]["keys"][0]["field"], "hash");
    }
}
