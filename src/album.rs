//! Music-album pack synthesis.
//!
//! Turns a flat track list into the menu/selection/playback graph the
//! player expects, so an album can be installed without hand-building a
//! story:
//!
//! ```text
//! cover ──ok──> choice menu ──wheel──> selection node (track i)
//!                                 │        ok──> playback i ──ok──> playback i+1 ...
//!                                 │                          last ──ok──> back to menu
//!                                 └< home from anywhere
//! ```
//!
//! Selection nodes preview a track inside the choice menu; playback
//! nodes chain sequentially so the album plays through on OK. HOME from
//! a playback node returns to the choice menu with that track selected.

use uuid::Uuid;

use crate::pack::{ActionNode, ControlSettings, StageNode, StoryPack, Transition};

/// One track of an album.
#[derive(Debug, Clone)]
pub struct AlbumTrack {
    pub title: String,
    /// Audio asset name in the caller's store.
    pub audio: String,
    /// Optional per-track image asset name; the album cover is used when
    /// absent.
    pub image: Option<String>,
}

/// Input description of a music album.
#[derive(Debug, Clone)]
pub struct MusicAlbum {
    pub title: String,
    pub artist: String,
    /// Cover image asset name; doubles as the fallback track image.
    pub cover: String,
    pub tracks: Vec<AlbumTrack>,
}

impl MusicAlbum {
    /// Synthesize the story graph for this album.
    ///
    /// For N tracks the graph has `1 + 2N` stage nodes (menu, N
    /// selection, N playback) and `2 + N` action nodes (cover action,
    /// N play actions, one choice menu).
    pub fn into_pack(self, uuid: Uuid) -> StoryPack {
        let select_uuids: Vec<Uuid> = self.tracks.iter().map(|_| Uuid::new_v4()).collect();
        let play_uuids: Vec<Uuid> = self.tracks.iter().map(|_| Uuid::new_v4()).collect();

        let mut stage_nodes = Vec::with_capacity(1 + 2 * self.tracks.len());
        let mut action_nodes = Vec::with_capacity(2 + self.tracks.len());

        // Cover menu: wheel + OK only, waits for the child.
        stage_nodes.push(StageNode {
            uuid,
            image: Some(self.cover.clone()),
            audio: None,
            ok_transition: Some(Transition {
                action_node: "choice_menu".into(),
                option_index: 0,
            }),
            home_transition: None,
            control_settings: ControlSettings {
                wheel: true,
                ok: true,
                ..Default::default()
            },
        });
        action_nodes.push(ActionNode {
            id: "cover_action".into(),
            options: vec![uuid],
        });

        for (i, track) in self.tracks.iter().enumerate() {
            let image = track.image.clone().unwrap_or_else(|| self.cover.clone());
            let is_last = i == self.tracks.len() - 1;

            // Selection node: heard while browsing the choice menu.
            stage_nodes.push(StageNode {
                uuid: select_uuids[i],
                image: Some(image.clone()),
                audio: Some(track.audio.clone()),
                ok_transition: Some(Transition {
                    action_node: format!("play_action_{i}"),
                    option_index: 0,
                }),
                home_transition: Some(Transition {
                    action_node: "cover_action".into(),
                    option_index: 0,
                }),
                control_settings: ControlSettings {
                    wheel: true,
                    ok: true,
                    home: true,
                    autoplay: true,
                    ..Default::default()
                },
            });

            // Playback node: sequential play, OK skips to the next track.
            stage_nodes.push(StageNode {
                uuid: play_uuids[i],
                image: Some(image),
                audio: Some(track.audio.clone()),
                ok_transition: Some(Transition {
                    action_node: if is_last {
                        "choice_menu".into()
                    } else {
                        format!("play_action_{}", i + 1)
                    },
                    option_index: 0,
                }),
                home_transition: Some(Transition {
                    action_node: "choice_menu".into(),
                    option_index: i as i32,
                }),
                control_settings: ControlSettings {
                    ok: true,
                    home: true,
                    pause: true,
                    autoplay: true,
                    pause_can_resume: true,
                    ..Default::default()
                },
            });

            action_nodes.push(ActionNode {
                id: format!("play_action_{i}"),
                options: vec![play_uuids[i]],
            });
        }

        action_nodes.push(ActionNode {
            id: "choice_menu".into(),
            options: select_uuids,
        });

        StoryPack {
            uuid,
            title: self.title,
            description: format!("Album by {}", self.artist),
            version: 1,
            stage_nodes,
            action_nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn three_track_album() -> MusicAlbum {
        MusicAlbum {
            title: "Bedtime Songs".into(),
            artist: "Various".into(),
            cover: "cover.png".into(),
            tracks: vec![
                AlbumTrack {
                    title: "One".into(),
                    audio: "one.mp3".into(),
                    image: Some("one.png".into()),
                },
                AlbumTrack {
                    title: "Two".into(),
                    audio: "two.mp3".into(),
                    image: None,
                },
                AlbumTrack {
                    title: "Three".into(),
                    audio: "three.mp3".into(),
                    image: None,
                },
            ],
        }
    }

    #[test]
    fn three_tracks_make_seven_stage_and_five_action_nodes() {
        let pack = three_track_album().into_pack(Uuid::new_v4());
        assert_eq!(pack.stage_nodes.len(), 7);
        assert_eq!(pack.action_nodes.len(), 5);

        let option_counts: Vec<usize> =
            pack.action_nodes.iter().map(|a| a.options.len()).collect();
        // cover action, three play actions, choice menu.
        assert_eq!(option_counts, vec![1, 1, 1, 1, 3]);
    }

    #[test]
    fn asset_slots_cover_fallback() {
        let pack = three_track_album().into_pack(Uuid::new_v4());
        let images = pack.image_asset_list();
        // Shared cover + the single per-track image; tracks without one
        // fall back to the cover rather than minting a new slot.
        let names: Vec<&str> = images.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["cover.png", "one.png"]);

        let audio = pack.audio_asset_list();
        assert_eq!(audio.len(), 3);
        let positions: Vec<u32> = audio.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn album_graph_serializes() {
        let pack = three_track_album().into_pack(Uuid::new_v4());
        let bins = pack.to_binaries().unwrap();
        // 1 + 1 + 1 + 1 + 3 options laid out as words.
        assert_eq!(bins.li.len(), 7 * 4);
        let decoded =
            StoryPack::from_binaries(pack.uuid, &bins.ni, &bins.li, &bins.ri, &bins.si).unwrap();
        assert_eq!(decoded.stage_nodes.len(), 7);
        assert_eq!(decoded.action_nodes.len(), 5);
    }
}
