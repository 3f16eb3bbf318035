/**
 * User Schema
 */

use serde_json::{Map, Value};

use crate::backend::store::{Document, Field, FieldType, Schema};

pub const USERS: &str = "users";

pub const ROLES: [&str; 6] = ["super-admin", "admin", "manager", "driver", "worker", "user"];

/// Roles allowed to modify other users
pub const ADMIN_ROLES: &[&str] = &["super-admin", "admin"];

pub fn user_schema() -> Schema {
    Schema::new(USERS)
        .field(Field::string("firstName").required())
        .field(Field::string("lastName").required())
        .field(Field::string("email").required().unique())
        .field(Field::string("avatar"))
        .field(Field::string("role").required().one_of(ROLES))
        .field(Field::array("workingDays").required())
        .field(Field::number("workingHours").required().one_of([1, 2]))
        .field(Field::number("remainingTime"))
        .field(Field::number("maxProjectLimit"))
        .field(Field::array("skillsets"))
        .field(Field::boolean("online").default_value(false))
        .field(Field::string("userName").required().unique())
        .field(Field::string("password").required().hidden())
        .field(Field::date("dob"))
        .field(Field::string("gender").one_of(["male", "female", "others"]))
        .field(Field::string("status").one_of(["active", "deactive"]))
        .field(Field::number("phone"))
        .field(Field::array_of("notifySubs", FieldType::Object).hidden())
        .hide_timestamps()
        .searchable(["firstName", "lastName", "email", "userName"])
}

/// Fields mirrored into the `users` search index
pub fn search_document(user: &Document) -> Value {
    let mut doc = Map::new();
    doc.insert("id".to_string(), Value::String(user.id.clone()));
    for key in ["firstName", "lastName", "email", "userName"] {
        if let Some(Value::String(value)) = user.get(key) {
            doc.insert(key.to_string(), Value::String(value.clone()));
        }
    }
    Value::Object(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    /// A user as a client of the REST API would post it
    fn full_user() -> Map<String, Value> {
        body(json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "role": "driver",
            "workingDays": ["mo", "tu", "we"],
            "workingHours": 2,
            "skillsets": ["rust"],
            "userName": "ada",
            "password": "hash",
            "dob": "1815-12-10",
            "gender": "others",
            "status": "deactive",
            "phone": 351912345678u64,
            "notifySubs": [{"endpoint": "https://push.example.com/1", "keys": {"auth": "a"}}]
        }))
    }

    #[test]
    fn test_accepts_full_user() {
        let schema = user_schema();
        let mut user = full_user();
        schema.apply_defaults(&mut user);
        assert!(schema.validate(&user).is_ok());
        assert_eq!(user["online"], json!(false));
        assert!(user.get("status").is_some());

        let mut fresh = full_user();
        fresh.remove("status");
        schema.apply_defaults(&mut fresh);
        assert!(fresh.get("status").is_none());
    }

    #[test]
    fn test_required_profile_fields() {
        let schema = user_schema();
        for key in ["firstName", "lastName", "userName", "workingDays", "workingHours"] {
            let mut user = full_user();
            user.remove(key);
            let err = schema.validate(&user).unwrap_err();
            assert!(err.to_string().contains(key), "{}", key);
        }
    }

    #[test]
    fn test_field_types() {
        let schema = user_schema();

        let mut user = full_user();
        user.insert("gender".into(), json!("other"));
        assert!(schema.validate(&user).is_err());

        let mut user = full_user();
        user.insert("phone".into(), json!("+351 912"));
        assert!(schema.validate(&user).is_err());

        let mut user = full_user();
        user.insert("notifySubs".into(), json!({"endpoint": "x"}));
        assert!(schema.validate(&user).is_err());
    }

    #[test]
    fn test_presented_user_hides_secrets() {
        let doc = Document::new(full_user());
        let out = user_schema().present(&doc);
        assert!(out.get("password").is_none());
        assert!(out.get("notifySubs").is_none());
        assert!(out.get("createdAt").is_none());
        assert_eq!(out["email"], "ada@example.com");
    }

    #[test]
    fn test_role_and_hours_enums() {
        let schema = user_schema();
        let mut user = full_user();
        user.insert("role".into(), json!("owner"));
        assert!(schema.validate(&user).is_err());
        user.insert("role".into(), json!("driver"));
        user.insert("workingHours".into(), json!(3));
        assert!(schema.validate(&user).is_err());
        user.insert("workingHours".into(), json!(1));
        assert!(schema.validate(&user).is_ok());
    }

    #[test]
    fn test_search_document() {
        let doc = Document::new(full_user());
        let indexed = search_document(&doc);
        assert_eq!(indexed["firstName"], "Ada");
        assert_eq!(indexed["userName"], "ada");
        assert!(indexed.get("password").is_none());
        assert_eq!(indexed["id"], json!(doc.id));
    }
}
