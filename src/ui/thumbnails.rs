use iced::widget::image::Handle;
use std::collections::HashMap;

use crate::state::data::ImagePayload;

/// Decoded image handles keyed by payload.
///
/// Payloads are decoded once when they first appear, not on every frame.
#[derive(Debug, Default)]
pub struct ThumbnailCache {
    handles: HashMap<ImagePayload, Handle>,
}

impl ThumbnailCache {
    pub fn get(&self, payload: &ImagePayload) -> Option<&Handle> {
        self.handles.get(payload)
    }

    /// Keep exactly the given payloads, decoding any new ones.
    /// Payloads that are not valid base64 data URIs are left out.
    pub fn sync<'a>(&mut self, payloads: impl IntoIterator<Item = &'a ImagePayload>) {
        let mut next = HashMap::with_capacity(self.handles.len());

        for payload in payloads {
            if next.contains_key(payload) {
                continue;
            }

            let handle = self
                .handles
                .remove(payload)
                .or_else(|| payload.decode_bytes().map(Handle::from_bytes));

            if let Some(handle) = handle {
                next.insert(payload.clone(), handle);
            }
        }

        self.handles = next;
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_keeps_only_current_payloads() {
        let a = ImagePayload::from_jpeg(&[1, 2, 3]);
        let b = ImagePayload::from_jpeg(&[4, 5, 6]);
        let broken = ImagePayload::from("data:image/jpeg;base64,%%%".to_string());

        let mut cache = ThumbnailCache::default();
        cache.sync([&a, &b, &a, &broken]);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&broken).is_none());

        cache.sync([&b]);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&a).is_none());
        assert!(cache.get(&b).is_some());
    }
}
