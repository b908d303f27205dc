use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::models::{Level, VoteDirection};

pub const MAX_PROMPT_TITLE: usize = 100;
pub const MAX_PROMPT_DESCRIPTION: usize = 500;
pub const MAX_IMAGE_CAPTION: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiTool {
    ChatGPT,
    Claude,
    Bard,
    Midjourney,
    #[serde(rename = "DALL-E")]
    DallE,
    #[serde(rename = "Stable Diffusion")]
    StableDiffusion,
    Other,
}

text_enum!(AiTool, "ai tool", {
    ChatGPT => "ChatGPT",
    Claude => "Claude",
    Bard => "Bard",
    Midjourney => "Midjourney",
    DallE => "DALL-E",
    StableDiffusion => "Stable Diffusion",
    Other => "Other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptCategory {
    Art,
    Writing,
    Code,
    Marketing,
    Design,
    Education,
    Other,
}

text_enum!(PromptCategory, "category", {
    Art => "Art",
    Writing => "Writing",
    Code => "Code",
    Marketing => "Marketing",
    Design => "Design",
    Education => "Education",
    Other => "Other",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptImage {
    pub public_id: String,
    pub url: String,
    pub format: String,
    pub width: u32,
    pub height: u32,
    /// Size reported by the image host; authoritative for storage accounting.
    pub bytes: u64,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub is_primary: bool,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Prompt {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub description: String,
    pub prompt_text: String,
    pub result_text: Option<String>,
    #[sqlx(try_from = "String")]
    pub ai_tool: AiTool,
    #[sqlx(try_from = "String")]
    pub category: PromptCategory,
    pub tags: Vec<String>,
    pub images: Json<Vec<PromptImage>>,
    pub is_public: bool,
    #[sqlx(try_from = "String")]
    pub requires_level: Level,
    pub upvoted_by: Vec<Uuid>,
    pub downvoted_by: Vec<Uuid>,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prompt {
    pub fn total_image_bytes(&self) -> u64 {
        self.images.iter().map(|image| image.bytes).sum()
    }

    /// Adds an image, making it primary when it is the first one.
    pub fn attach_image(&mut self, mut image: PromptImage) {
        image.is_primary = self.images.is_empty();
        self.images.push(image);
    }

    /// Removes the image at `index`, promoting the next one to primary if needed.
    pub fn detach_image(&mut self, index: usize) -> Option<PromptImage> {
        if index >= self.images.len() {
            return None;
        }
        let removed = self.images.remove(index);
        if removed.is_primary {
            if let Some(first) = self.images.first_mut() {
                first.is_primary = true;
            }
        }
        Some(removed)
    }

    /// Marks `index` as the only primary image. False when out of range.
    pub fn set_primary_image(&mut self, index: usize) -> bool {
        if index >= self.images.len() {
            return false;
        }
        for (i, image) in self.images.iter_mut().enumerate() {
            image.is_primary = i == index;
        }
        true
    }

    /// Casting the same vote twice retracts it; a vote in the other
    /// direction switches sides.
    pub fn toggle_vote(&mut self, voter: Uuid, direction: VoteDirection) {
        let (same, opposite) = match direction {
            VoteDirection::Up => (&mut self.upvoted_by, &mut self.downvoted_by),
            VoteDirection::Down => (&mut self.downvoted_by, &mut self.upvoted_by),
        };

        if let Some(pos) = same.iter().position(|id| *id == voter) {
            same.remove(pos);
        } else {
            opposite.retain(|id| *id != voter);
            same.push(voter);
        }
    }

    pub fn visible_to(&self, viewer: Option<Uuid>) -> bool {
        self.is_public || viewer == Some(self.author_id)
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreatePromptRequest {
    pub title: String,
    pub description: String,
    pub prompt_text: String,
    pub result_text: Option<String>,
    /// ChatGPT, Claude, Bard, Midjourney, DALL-E, Stable Diffusion or Other
    pub ai_tool: String,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_public: Option<bool>,
    pub requires_level: Option<String>,
}

/// Partial edit of a prompt. Absent fields keep their current value. New
/// images go through the image upload route.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdatePromptRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub prompt_text: Option<String>,
    pub result_text: Option<String>,
    pub ai_tool: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub requires_level: Option<String>,
    /// Indexes into the current image list
    #[serde(default)]
    pub images_to_delete: Vec<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PromptListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub ai_tool: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(bytes: u64) -> PromptImage {
        PromptImage {
            public_id: Uuid::new_v4().to_string(),
            url: "http://localhost/uploads/x.png".to_string(),
            format: "png".to_string(),
            width: 10,
            height: 10,
            bytes,
            caption: String::new(),
            is_primary: false,
            uploaded_at: Utc::now(),
        }
    }

    fn prompt() -> Prompt {
        let now = Utc::now();
        Prompt {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            title: "title".to_string(),
            description: "description".to_string(),
            prompt_text: "a cat in space".to_string(),
            result_text: None,
            ai_tool: AiTool::Midjourney,
            category: PromptCategory::Art,
            tags: vec![],
            images: Json(vec![]),
            is_public: false,
            requires_level: Level::Newbie,
            upvoted_by: vec![],
            downvoted_by: vec![],
            views: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_ai_tool_text_values() {
        assert_eq!("dall-e".parse::<AiTool>().unwrap(), AiTool::DallE);
        assert_eq!(AiTool::StableDiffusion.as_str(), "Stable Diffusion");
    }

    #[test]
    fn test_first_image_is_primary_and_promoted_on_removal() {
        let mut p = prompt();
        p.attach_image(image(100));
        p.attach_image(image(250));
        assert!(p.images[0].is_primary);
        assert!(!p.images[1].is_primary);
        assert_eq!(p.total_image_bytes(), 350);

        let removed = p.detach_image(0).unwrap();
        assert_eq!(removed.bytes, 100);
        assert!(p.images[0].is_primary);
        assert!(p.detach_image(5).is_none());
    }

    #[test]
    fn test_set_primary_image_moves_the_flag() {
        let mut p = prompt();
        p.attach_image(image(1));
        p.attach_image(image(2));
        p.attach_image(image(3));

        assert!(p.set_primary_image(2));
        let primaries: Vec<bool> = p.images.iter().map(|i| i.is_primary).collect();
        assert_eq!(primaries, vec![false, false, true]);
        assert!(!p.set_primary_image(3));
        assert!(p.images[2].is_primary);
    }

    #[test]
    fn test_downvote_switches_an_upvote() {
        let mut p = prompt();
        let voter = Uuid::new_v4();
        p.toggle_vote(voter, VoteDirection::Up);
        assert_eq!(p.upvoted_by, vec![voter]);

        p.toggle_vote(voter, VoteDirection::Down);
        assert!(p.upvoted_by.is_empty());
        assert_eq!(p.downvoted_by, vec![voter]);

        p.toggle_vote(voter, VoteDirection::Down);
        assert!(p.downvoted_by.is_empty());
    }

    #[test]
    fn test_private_prompt_visible_to_author_only() {
        let p = prompt();
        assert!(p.visible_to(Some(p.author_id)));
        assert!(!p.visible_to(Some(Uuid::new_v4())));
        assert!(!p.visible_to(None));
    }
}
