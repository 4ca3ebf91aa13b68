//! Tool layer: tool sets generated per user, exposed to the model through [`ToolExecutor`].

mod user_pets;

pub use crate::agent::ToolExecutor;
pub use crate::llm::ToolDefinition;
pub use user_pets::{
    generate_tools_for_user, user_pet_tool_definitions, UserPetTools, UserTools,
    DELETE_FAVORITE_PETS, LIST_FAVORITE_PETS, UPDATE_FAVORITE_PETS,
};
