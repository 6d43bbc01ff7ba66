use kiln_core::Schema;
use serde_json::json;

/// A schema exercising every relation shape and a delegate hierarchy.
pub(crate) fn blog() -> Schema {
    Schema::from_value(json!({
        "models": {
            "User": {
                "idFields": ["id"],
                "fields": {
                    "id": { "type": "Int", "id": true, "default": { "kind": "call", "function": "autoincrement" } },
                    "email": { "type": "String", "unique": true },
                    "name": { "type": "String", "optional": true },
                    "score": { "type": "Int", "default": 0 },
                    "balance": { "type": "Decimal", "optional": true },
                    "posts": { "type": "Post", "array": true, "relation": { "opposite": "author" } },
                    "profile": { "type": "Profile", "optional": true, "relation": { "opposite": "user" } },
                    "memberships": { "type": "Membership", "array": true, "relation": { "opposite": "user" } }
                }
            },
            "Post": {
                "idFields": ["id"],
                "fields": {
                    "id": { "type": "Int", "id": true, "default": { "kind": "call", "function": "autoincrement" } },
                    "title": { "type": "String" },
                    "published": { "type": "Boolean", "default": false },
                    "tags": { "type": "String", "array": true, "optional": true },
                    "createdAt": { "type": "DateTime", "default": { "kind": "call", "function": "now" } },
                    "updatedAt": { "type": "DateTime", "updatedAt": true },
                    "authorId": { "type": "Int", "optional": true, "foreignKeyFor": ["author"] },
                    "author": {
                        "type": "User",
                        "optional": true,
                        "relation": { "fields": ["authorId"], "references": ["id"], "opposite": "posts" }
                    },
                    "categories": { "type": "Category", "array": true, "relation": { "opposite": "posts" } }
                }
            },
            "Category": {
                "idFields": ["id"],
                "fields": {
                    "id": { "type": "String", "id": true, "default": { "kind": "call", "function": "uuid", "args": [7] } },
                    "name": { "type": "String", "unique": true },
                    "posts": { "type": "Post", "array": true, "relation": { "opposite": "categories" } }
                }
            },
            "Profile": {
                "idFields": ["id"],
                "fields": {
                    "id": { "type": "Int", "id": true, "default": { "kind": "call", "function": "autoincrement" } },
                    "bio": { "type": "String" },
                    "userId": { "type": "Int", "unique": true, "foreignKeyFor": ["user"] },
                    "user": {
                        "type": "User",
                        "relation": { "fields": ["userId"], "references": ["id"], "opposite": "profile", "onDelete": "Cascade" }
                    }
                }
            },
            "Membership": {
                "idFields": ["id"],
                "uniqueFields": { "userId_groupId": ["userId", "groupId"] },
                "fields": {
                    "id": { "type": "Int", "id": true, "default": { "kind": "call", "function": "autoincrement" } },
                    "userId": { "type": "Int", "foreignKeyFor": ["user"] },
                    "groupId": { "type": "Int" },
                    "user": {
                        "type": "User",
                        "relation": { "fields": ["userId"], "references": ["id"], "opposite": "memberships" }
                    }
                }
            },
            "Asset": {
                "idFields": ["id"],
                "isDelegate": true,
                "discriminator": "kind",
                "fields": {
                    "id": { "type": "Int", "id": true, "default": { "kind": "call", "function": "autoincrement" } },
                    "kind": { "type": "String" },
                    "views": { "type": "Int", "default": 0 }
                }
            },
            "Video": {
                "idFields": ["id"],
                "baseModel": "Asset",
                "fields": { "duration": { "type": "Int" } }
            },
            "Image": {
                "idFields": ["id"],
                "baseModel": "Asset",
                "fields": { "width": { "type": "Int" } }
            }
        }
    }))
    .expect("valid schema")
}
