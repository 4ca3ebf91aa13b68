//! Favorite-pet tools bound to one user.
//!
//! The user id is captured when the tools are generated and never appears in a
//! tool schema, so the model can only act on behalf of the bound user.

use futures_util::future::BoxFuture;
use serde_json::json;

use crate::agent::ToolExecutor;
use crate::events::ToolContext;
use crate::llm::ToolDefinition;
use crate::registry::{UserId, UserRegistry};

pub const UPDATE_FAVORITE_PETS: &str = "update_favorite_pets";
pub const DELETE_FAVORITE_PETS: &str = "delete_favorite_pets";
pub const LIST_FAVORITE_PETS: &str = "list_favorite_pets";

type UpdateFn = Box<dyn Fn(Vec<String>) -> BoxFuture<'static, ()> + Send + Sync>;
type DeleteFn = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;
type ListFn = Box<dyn Fn() -> BoxFuture<'static, Vec<String>> + Send + Sync>;

/// The update/delete/list operations for one user, closed over that user's id.
pub struct UserTools {
    user_id: UserId,
    update: UpdateFn,
    delete: DeleteFn,
    list: ListFn,
}

impl std::fmt::Debug for UserTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserTools")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Build a fresh set of tools for `user_id` over the shared registry.
///
/// Calling this twice for the same user yields independent closures that share
/// the same backing entry.
pub fn generate_tools_for_user(registry: &UserRegistry, user_id: impl Into<UserId>) -> UserTools {
    let user_id = user_id.into();

    let update: UpdateFn = {
        let registry = registry.clone();
        let user_id = user_id.clone();
        Box::new(move |pets: Vec<String>| -> BoxFuture<'static, ()> {
            let registry = registry.clone();
            let user_id = user_id.clone();
            Box::pin(async move { registry.set(&user_id, pets).await })
        })
    };

    let delete: DeleteFn = {
        let registry = registry.clone();
        let user_id = user_id.clone();
        Box::new(move || -> BoxFuture<'static, ()> {
            let registry = registry.clone();
            let user_id = user_id.clone();
            Box::pin(async move { registry.remove(&user_id).await })
        })
    };

    let list: ListFn = {
        let registry = registry.clone();
        let user_id = user_id.clone();
        Box::new(move || -> BoxFuture<'static, Vec<String>> {
            let registry = registry.clone();
            let user_id = user_id.clone();
            Box::pin(async move { registry.get(&user_id).await })
        })
    };

    UserTools {
        user_id,
        update,
        delete,
        list,
    }
}

impl UserTools {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Replace the bound user's favorite pets.
    pub async fn update(&self, pets: Vec<String>) {
        (self.update)(pets).await
    }

    /// Remove the bound user's entry; no-op when there is none.
    pub async fn delete(&self) {
        (self.delete)().await
    }

    /// The bound user's favorite pets, empty when none are stored.
    pub async fn list(&self) -> Vec<String> {
        (self.list)().await
    }
}

/// [`UserTools`] exposed to the model as three function tools.
#[derive(Debug)]
pub struct UserPetTools {
    tools: UserTools,
}

impl UserPetTools {
    pub fn new(tools: UserTools) -> Self {
        Self { tools }
    }

    pub fn for_user(registry: &UserRegistry, user_id: impl Into<UserId>) -> Self {
        Self::new(generate_tools_for_user(registry, user_id))
    }

    pub fn user_id(&self) -> &str {
        self.tools.user_id()
    }
}

#[async_trait::async_trait]
impl ToolExecutor for UserPetTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        user_pet_tool_definitions()
    }

    async fn execute(
        &self,
        name: &str,
        args: &serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<String, String> {
        let args = args.as_object().ok_or("arguments must be an object")?;
        match name {
            UPDATE_FAVORITE_PETS => {
                let pets = parse_pets(args.get("pets"))?;
                log::debug!("tools: {} for {} ({} pets)", name, self.user_id(), pets.len());
                self.tools.update(pets).await;
                Ok(json!(null).to_string())
            }
            DELETE_FAVORITE_PETS => {
                log::debug!("tools: {} for {}", name, self.user_id());
                self.tools.delete().await;
                Ok(json!(null).to_string())
            }
            LIST_FAVORITE_PETS => {
                let pets = self.tools.list().await;
                serde_json::to_string(&pets).map_err(|e| e.to_string())
            }
            _ => Err(format!("unknown tool: {}", name)),
        }
    }
}

fn parse_pets(value: Option<&serde_json::Value>) -> Result<Vec<String>, String> {
    let items = value
        .ok_or("missing parameter: pets")?
        .as_array()
        .ok_or("parameter pets must be an array of strings")?;
    items
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| "parameter pets must be an array of strings".to_string())
        })
        .collect()
}

/// Function definitions for the three pet tools. None of them takes a user id.
pub fn user_pet_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::function(
            UPDATE_FAVORITE_PETS,
            "Add the list of favorite pets.",
            json!({
                "type": "object",
                "required": ["pets"],
                "properties": {
                    "pets": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of favorite pets to set."
                    }
                }
            }),
        ),
        ToolDefinition::function(
            DELETE_FAVORITE_PETS,
            "Delete the list of favorite pets.",
            json!({ "type": "object", "properties": {} }),
        ),
        ToolDefinition::function(
            LIST_FAVORITE_PETS,
            "List favorite pets if any.",
            json!({ "type": "object", "properties": {} }),
        ),
    ]
}
