//! Schemas shared by the integration tests.

use kiln::Schema;
use serde_json::json;

/// Users with posts, profiles, badges and memberships; posts in many-to-many
/// categories; orders for aggregation; and an `Asset` delegate with `Video`
/// and `Image` sub-models. Videos belong to a user and go when it does.
pub fn blog() -> Schema {
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
                    "memberships": { "type": "Membership", "array": true, "relation": { "opposite": "user" } },
                    "badge": { "type": "Badge", "optional": true, "relation": { "opposite": "holder" } },
                    "videos": { "type": "Video", "array": true, "relation": { "opposite": "owner" } }
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
            "Badge": {
                "idFields": ["id"],
                "fields": {
                    "id": { "type": "Int", "id": true, "default": { "kind": "call", "function": "autoincrement" } },
                    "label": { "type": "String", "unique": true },
                    "holderId": { "type": "Int", "optional": true, "unique": true, "foreignKeyFor": ["holder"] },
                    "holder": {
                        "type": "User",
                        "optional": true,
                        "relation": { "fields": ["holderId"], "references": ["id"], "opposite": "badge" }
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
            "Order": {
                "idFields": ["id"],
                "fields": {
                    "id": { "type": "Int", "id": true, "default": { "kind": "call", "function": "autoincrement" } },
                    "status": { "type": "String" },
                    "amount": { "type": "Int" },
                    "total": { "type": "Decimal", "optional": true }
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
                "fields": {
                    "duration": { "type": "Int" },
                    "ownerId": { "type": "Int", "optional": true, "foreignKeyFor": ["owner"] },
                    "owner": {
                        "type": "User",
                        "optional": true,
                        "relation": { "fields": ["ownerId"], "references": ["id"], "opposite": "videos", "onDelete": "Cascade" }
                    }
                }
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
