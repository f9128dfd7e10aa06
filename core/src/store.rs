//! Last fetched image feed.

use crate::types::Image;

#[derive(Debug, Default)]
pub struct RecordStore {
    images: Vec<Image>,
    has_received_initial_images: bool,
}

impl RecordStore {
    pub fn replace_images(&mut self, images: Vec<Image>) {
        self.images = images;
        self.has_received_initial_images = true;
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn images_for_user(&self, user_id: &str) -> Vec<Image> {
        self.images
            .iter()
            .filter(|image| image.user_id() == user_id)
            .cloned()
            .collect()
    }

    pub fn has_received_initial_images(&self) -> bool {
        self.has_received_initial_images
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::User;

    fn image(file_name: &str, user_id: &str) -> Image {
        serde_json::from_value(serde_json::json!({
            "fileName": file_name,
            "user": { "_id": user_id, "name": "someone" }
        }))
        .unwrap()
    }

    #[test]
    fn starts_empty_and_unfetched() {
        let store = RecordStore::default();
        assert!(store.images().is_empty());
        assert!(!store.has_received_initial_images());
    }

    #[test]
    fn replace_marks_initial_images_received() {
        let mut store = RecordStore::default();
        store.replace_images(Vec::new());
        assert!(store.has_received_initial_images());
    }

    #[test]
    fn filters_by_owner() {
        let mut store = RecordStore::default();
        store.replace_images(vec![image("a", "u1"), image("b", "u2"), image("c", "u1")]);
        let mine: Vec<_> = store
            .images_for_user("u1")
            .into_iter()
            .map(|image| image.file_name)
            .collect();
        assert_eq!(mine, ["a", "c"]);
        assert!(store.images_for_user("nobody").is_empty());
        assert_eq!(
            store.images()[1].user,
            User {
                id: "u2".to_string(),
                name: "someone".to_string()
            }
        );
    }
}
