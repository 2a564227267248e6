//! Sequence preset: a list of child presets with start delays.
//!
//! A sequence renders nothing itself. Each tick, children whose delay has
//! elapsed produce a trigger request on the task queue instead of being
//! played inline, so nested playback never extends the current tick's
//! call stack. Wire fields after the header: `count: u8`, `items: u16`
//! (offset to `count` consecutive 5-byte occurrence records
//! `{ preset: u16, delay: u16 scalar offset, blend: u8 }`).

use heapless::Vec;

use crate::buffer::{BufferError, ByteReader, DataSet, FixedRecord, Offset, OffsetArray};
use crate::controller::Tag;
use crate::eval::{EvalContext, clamp_param};
use crate::node::ScalarNode;
use crate::preset::{BlendMode, MAX_SEQUENCE_CHILDREN, PresetHeader};
use crate::task::{TriggerBacklog, TriggerRequest};

/// One serialized child occurrence (5 bytes on the wire).
#[derive(Debug, Clone, Copy)]
pub struct SequenceItem {
    pub preset: Offset<PresetHeader>,
    /// Start delay expression, evaluated at sequence start.
    pub delay: Offset<ScalarNode>,
    pub blend: BlendMode,
}

impl FixedRecord for SequenceItem {
    const SIZE: usize = 5;
}

impl SequenceItem {
    fn from_bytes(set: DataSet<'_>, offset: Offset<Self>) -> Result<Self, BufferError> {
        let mut r = ByteReader::new(set.buffer, offset.raw())?;
        Ok(Self {
            preset: r.read_offset()?,
            delay: r.read_offset()?,
            blend: {
                let raw = r.read_u8()?;
                BlendMode::from_raw(raw, offset.raw())
            },
        })
    }
}

/// Decoded sequence preset fields.
#[derive(Debug, Clone, Copy)]
pub struct SequencePreset {
    pub items: OffsetArray<SequenceItem>,
}

impl SequencePreset {
    pub(crate) fn read(r: &mut ByteReader<'_>) -> Result<Self, BufferError> {
        let count = r.read_u8()?;
        let offset = r.read_u16()?;
        Ok(Self {
            items: OffsetArray::new(offset, count),
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Child {
    preset: Offset<PresetHeader>,
    delay_ms: u32,
    blend: BlendMode,
}

/// Per-playback sequence state.
///
/// Child delays are evaluated once at start; a fired bitmask guarantees
/// each child triggers exactly once per repetition window.
#[derive(Debug, Clone)]
pub struct SequenceInstance {
    children: Vec<Child, MAX_SEQUENCE_CHILDREN>,
    fired: u8,
    remap_face: u8,
    tag: Tag,
}

impl SequenceInstance {
    pub(crate) fn start(
        set: DataSet<'_>,
        preset: &SequencePreset,
        ctx: &EvalContext<'_>,
        remap_face: u8,
        tag: Tag,
    ) -> Result<Self, BufferError> {
        let mut children = Vec::new();
        let count = preset.items.count().min(MAX_SEQUENCE_CHILDREN as u8);
        for index in 0..count {
            let item = SequenceItem::from_bytes(set, preset.items.at(index))?;
            let delay_ms = u32::from(clamp_param(ctx.scalar(item.delay)));
            // capacity matches the count bound above
            let _ = children.push(Child {
                preset: item.preset,
                delay_ms,
                blend: item.blend,
            });
        }
        Ok(Self {
            children,
            fired: 0,
            remap_face,
            tag,
        })
    }

    /// Clear the fired bitmask when a new repetition window begins, so
    /// looping sequences trigger their children again each pass.
    pub(crate) fn rewind(&mut self) {
        self.fired = 0;
    }

    pub(crate) fn render(&mut self, t_ms: u32, triggers: &mut TriggerBacklog) {
        for (index, child) in self.children.iter().enumerate() {
            let bit = 1u8 << index;
            if self.fired & bit != 0 || t_ms < child.delay_ms {
                continue;
            }
            let request = TriggerRequest {
                preset: child.preset,
                remap_face: self.remap_face,
                loop_count: 1,
                tag: self.tag,
                blend: child.blend,
            };
            if triggers.push(request).is_err() {
                // Backlog full; leave unfired so the next tick retries.
                warn_log!("trigger backlog full, child deferred");
                return;
            }
            self.fired |= bit;
        }
    }
}
