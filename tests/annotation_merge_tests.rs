//! Tests for merging declarations into the metadata store
//!
//! These tests verify that:
//! - Applying the same declarations in any order yields identical records
//! - Markers on one target merge into a single record
//! - Single-valued markers keep the latest declaration

use decl::annotations::AnnotationSet;
use decl::metadata::Registry;
use decl::prelude::*;

// =============================================================================
// Helpers
// =============================================================================

fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut result = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            result.push(tail);
        }
    }
    result
}

fn apply_in_order(annotations: &[decl::annotations::Declared]) -> MetadataStore {
    let mut store = MetadataStore::new();
    store.apply(annotations.to_vec());
    store
}

fn noop(name: &str) -> SharedMiddleware {
    middleware_fn(name, |req: RequestData| async move { Ok(req) })
}

// =============================================================================
// Order independence
// =============================================================================

mod order_independence_tests {
    use super::*;

    #[test]
    fn test_property_record_is_identical_for_every_permutation() {
        let mut decl = SchemaDecl::new("Profile");
        decl.property("email")
            .expose_with(ExposeOptions {
                name: Some("mail".to_string()),
                groups: vec!["owner".to_string()],
            })
            .required()
            .is_email()
            .default_value(json!("nobody@example.com"))
            .exclude_unless(&["admin"]);
        let annotations: Vec<_> = decl.into_annotations().into_iter().collect();
        assert_eq!(annotations.len(), 5);

        let id = SchemaId::new("Profile");
        let expected = format!("{:?}", apply_in_order(&annotations).schema(&id));

        for order in permutations(&annotations) {
            let store = apply_in_order(&order);
            assert_eq!(format!("{:?}", store.schema(&id)), expected);
        }
    }

    #[test]
    fn test_validators_keep_declaration_order_whatever_the_apply_order() {
        let mut decl = SchemaDecl::new("Signup");
        decl.property("password")
            .check("first", |_, _| Err("first".to_string()))
            .check("second", |_, _| Err("second".to_string()))
            .check("third", |_, _| Err("third".to_string()));
        let mut annotations: Vec<_> = decl.into_annotations().into_iter().collect();
        annotations.reverse();

        let store = apply_in_order(&annotations);
        let property = store
            .schema(&SchemaId::new("Signup"))
            .and_then(|s| s.property("password"))
            .unwrap();
        let names: Vec<_> = property.validators().map(|v| v.name()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_property_order_follows_first_declaration() {
        let mut decl = SchemaDecl::new("User");
        decl.property("id").expose();
        decl.property("email").expose();
        decl.property("name").expose();
        decl.property("id").required();
        let mut annotations: Vec<_> = decl.into_annotations().into_iter().collect();
        annotations.reverse();

        let store = apply_in_order(&annotations);
        let keys: Vec<_> = store
            .schema(&SchemaId::new("User"))
            .unwrap()
            .properties()
            .map(|p| p.key().to_string())
            .collect();
        assert_eq!(keys, vec!["id", "email", "name"]);
    }

    #[test]
    fn test_applying_twice_changes_nothing() {
        let mut decl = SchemaDecl::new("Tag");
        decl.property("label").required().is_string();
        let annotations: Vec<_> = decl.into_annotations().into_iter().collect();

        let once = apply_in_order(&annotations);
        let mut twice = apply_in_order(&annotations);
        twice.apply(annotations.clone());

        let id = SchemaId::new("Tag");
        assert_eq!(format!("{:?}", once.schema(&id)), format!("{:?}", twice.schema(&id)));
    }

    #[test]
    fn test_route_record_is_identical_for_every_permutation() {
        let mut decl = ControllerDecl::new("Users");
        decl.route("update")
            .use_middleware(noop("audit"))
            .validate_body_with::<UpdateUser>(ValidationOptions::default())
            .put("/:id")
            .use_middleware(noop("owner_only"));
        let annotations: Vec<_> = decl.into_annotations().into_iter().collect();

        let id = decl::metadata::ControllerId::new("Users");
        let expected = format!("{:?}", apply_in_order(&annotations).controller(&id));

        for order in permutations(&annotations) {
            let store = apply_in_order(&order);
            assert_eq!(format!("{:?}", store.controller(&id)), expected);
        }
    }

    struct UpdateUser;

    impl Schema for UpdateUser {
        const NAME: &'static str = "UpdateUser";

        fn declare(decl: &mut SchemaDecl) {
            decl.property("name").is_string();
        }
    }
}

// =============================================================================
// Merging into one record
// =============================================================================

mod single_record_tests {
    use super::*;

    struct LoginRequest;

    impl Schema for LoginRequest {
        const NAME: &'static str = "LoginRequest";

        fn declare(decl: &mut SchemaDecl) {
            decl.property("email").required();
        }
    }

    #[test]
    fn test_verb_after_validation_merges_into_one_route() {
        let mut decl = ControllerDecl::new("Auth");
        decl.route("login").validate_body::<LoginRequest>();
        decl.route("login").post("/login");

        let mut store = MetadataStore::new();
        store.declare_controller_with(decl);
        let routes = store.routes(&decl::metadata::ControllerId::new("Auth"));

        assert_eq!(routes.len(), 1);
        let route = &routes[0];
        assert_eq!(route.method(), HttpMethod::Post);
        assert_eq!(route.path(), "/login");
        assert_eq!(
            route.body_validation().map(|v| v.schema.as_str()),
            Some("LoginRequest")
        );
    }

    #[test]
    fn test_verb_overwrites_placeholder_defaults() {
        let mut decl = ControllerDecl::new("Search");
        decl.route("find").validate_body::<LoginRequest>();

        let mut store = MetadataStore::new();
        store.declare_controller_with(decl);
        let id = decl::metadata::ControllerId::new("Search");
        assert_eq!(store.routes(&id)[0].method(), HttpMethod::Post);
        assert_eq!(store.routes(&id)[0].path(), "");

        let mut later = ControllerDecl::new("Search");
        later.route("find").get("/find");
        store.declare_controller_with(later);
        assert_eq!(store.routes(&id)[0].method(), HttpMethod::Get);
        assert_eq!(store.routes(&id)[0].path(), "/find");
    }

    #[test]
    fn test_latest_single_valued_marker_wins() {
        let mut decl = SchemaDecl::new("Settings");
        decl.property("theme")
            .default_value(json!("light"))
            .expose_as("colorScheme")
            .default_value(json!("dark"));

        let mut store = MetadataStore::new();
        store.declare_schema_with(decl);
        let registry: Registry = store.freeze();
        let property = registry
            .schema(&SchemaId::new("Settings"))
            .and_then(|s| s.property("theme"))
            .unwrap();

        assert_eq!(property.default_value(), Some(&json!("dark")));
        assert_eq!(property.output_key(), "colorScheme");
        assert!(property.is_exposed());
    }

    #[test]
    fn test_separate_declarations_accumulate() {
        let mut first = SchemaDecl::new("Account");
        first.property("email").required();
        let mut second = SchemaDecl::new("Account");
        second.property("email").is_email();
        second.exclude_extraneous_values();

        let mut combined = AnnotationSet::new();
        combined.extend(second.into_annotations());
        combined.extend(first.into_annotations());

        let mut store = MetadataStore::new();
        store.declare(combined);
        let class = store.schema(&SchemaId::new("Account")).unwrap();

        assert!(class.exclude_extraneous_values());
        let names: Vec<_> = class
            .property("email")
            .unwrap()
            .validators()
            .map(|v| v.name())
            .collect();
        assert_eq!(names, vec!["required", "is_email"]);
    }

    #[test]
    fn test_nested_schemas_declared_in_either_order() {
        struct Team;
        struct Member;

        impl Schema for Team {
            const NAME: &'static str = "Team";

            fn declare(decl: &mut SchemaDecl) {
                decl.property("members").nested::<Member>();
            }
        }

        impl Schema for Member {
            const NAME: &'static str = "Member";

            fn declare(decl: &mut SchemaDecl) {
                decl.property("team").nested::<Team>();
                decl.property("name").expose_as("displayName");
            }
        }

        let mut store = MetadataStore::new();
        store.declare_schema::<Team>().declare_schema::<Member>();
        let registry = store.freeze();

        let plain = json!({ "members": [{ "name": "Ada", "team": { "members": [] } }] });
        let transformed = registry
            .plain_to_class(&Team::schema_id(), &plain, &TransformOptions::default())
            .unwrap();
        let back = transformed
            .to_plain(&registry, &TransformOptions::default())
            .unwrap();

        assert_eq!(
            back,
            json!({ "members": [{ "displayName": "Ada", "team": { "members": [] } }] })
        );
    }
}
