//! Sound and graphic requests.
//!
//! Tasks and events latch resource requests into the game state as they run; the host
//! collects them at a sync point. Only changes against what is already playing or shown
//! reach the sink.

use drifter_data::{ResourceDef, ResourceRef};

/// Receiver for media requests, implemented by whatever front end plays sounds and shows
/// pictures.
pub trait ResourceSink {
    fn request_sound(&mut self, name: &str, offset: u64, length: u64);
    fn request_graphic(&mut self, name: &str, offset: u64, length: u64);
    fn stop_sound(&mut self);
}

/// Requested versus active resources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceLatch {
    pub requested_sound: Option<ResourceRef>,
    pub requested_graphic: Option<ResourceRef>,
    pub stop_sound: bool,
    pub playing_sound: Option<ResourceRef>,
    pub displayed_graphic: Option<ResourceRef>,
}

impl ResourceLatch {
    /// Record the requests carried by an authored resource block.
    pub fn handle(&mut self, resource: &ResourceDef) {
        if resource.stop_sound {
            self.silence();
        }
        if let Some(sound) = &resource.sound {
            self.requested_sound = Some(sound.clone());
        }
        if let Some(graphic) = &resource.graphic {
            self.requested_graphic = Some(graphic.clone());
        }
    }

    /// Drop any requested sound and stop whatever is playing at the next sync.
    pub fn silence(&mut self) {
        self.requested_sound = None;
        self.stop_sound = true;
    }

    /// Push pending changes to the sink.
    pub fn sync(&mut self, sink: &mut dyn ResourceSink) {
        if self.stop_sound {
            if self.playing_sound.is_some() {
                sink.stop_sound();
                self.playing_sound = None;
            }
            self.stop_sound = false;
        }
        if self.requested_sound != self.playing_sound {
            if let Some(sound) = &self.requested_sound {
                sink.request_sound(&sound.name, sound.offset, sound.length);
            }
            self.playing_sound = self.requested_sound.clone();
        }
        if self.requested_graphic != self.displayed_graphic {
            if let Some(graphic) = &self.requested_graphic {
                sink.request_graphic(&graphic.name, graphic.offset, graphic.length);
            }
            self.displayed_graphic = self.requested_graphic.clone();
        }
    }
}
