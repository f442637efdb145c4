use crate::section::{Section, LIGHT_LEN};
use crate::version::SchemaVersion;
use std::collections::BTreeMap;
use worlddiff_common::{Result, WorldDiffError};
use worlddiff_protocol::{LightMask, MaskEncoding, PacketBuffer};

/// One of the two light arrays a section carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightChannel {
    Sky,
    Block,
}

impl LightChannel {
    pub fn name(self) -> &'static str {
        match self {
            LightChannel::Sky => "SkyLight",
            LightChannel::Block => "BlockLight",
        }
    }

    pub fn get(self, section: &Section) -> Option<&Vec<u8>> {
        match self {
            LightChannel::Sky => section.sky_light.as_ref(),
            LightChannel::Block => section.block_light.as_ref(),
        }
    }

    pub fn set(self, section: &mut Section, data: Option<Vec<u8>>) {
        match self {
            LightChannel::Sky => section.sky_light = data,
            LightChannel::Block => section.block_light = data,
        }
    }

    /// Masks describing the sections' arrays of this channel: `present` for
    /// arrays holding any light, `empty` for arrays that are all zero.
    pub fn masks(
        self,
        sections: &BTreeMap<i8, Section>,
        version: &SchemaVersion,
    ) -> (LightMask, LightMask) {
        let mut present = LightMask::new();
        let mut empty = LightMask::new();
        for (&y, section) in sections {
            if let Some(data) = self.get(section) {
                let index = version.light_index(y);
                if data.iter().all(|&b| b == 0) {
                    empty.set(index, true);
                } else {
                    present.set(index, true);
                }
            }
        }
        (present, empty)
    }

    /// Walks `present` and `empty` together over the light sections of
    /// `version`. Present sections read a length-prefixed array, known-empty
    /// sections yield zeros, all others are left out. Returns section y with
    /// its array, lowest first.
    pub fn read_arrays(
        self,
        buffer: &mut PacketBuffer,
        version: &SchemaVersion,
        present: &LightMask,
        empty: &LightMask,
    ) -> Result<Vec<(i32, Vec<u8>)>> {
        if version.light_masks == MaskEncoding::LongArray {
            let count = buffer.read_length()?;
            if count != present.count() {
                return Err(WorldDiffError::ProtocolError(format!(
                    "{} mask has {} sections but {} arrays follow",
                    self.name(),
                    present.count(),
                    count
                )));
            }
        }

        let mut arrays = Vec::new();
        for index in 0..version.light_sections {
            let y = version.light_section_y(index);
            if present.get(index) {
                let data = buffer.read_byte_array()?;
                if data.len() != LIGHT_LEN {
                    return Err(WorldDiffError::ProtocolError(format!(
                        "{} array for section {} is {} bytes",
                        self.name(),
                        y,
                        data.len()
                    )));
                }
                arrays.push((y, data));
            } else if empty.get(index) {
                arrays.push((y, vec![0; LIGHT_LEN]));
            }
        }
        Ok(arrays)
    }

    /// Writes the arrays flagged in `present`, in mask order.
    pub fn write_arrays(
        self,
        buffer: &mut PacketBuffer,
        version: &SchemaVersion,
        sections: &BTreeMap<i8, Section>,
        present: &LightMask,
    ) {
        if version.light_masks == MaskEncoding::LongArray {
            buffer.write_varint(present.count() as i32);
        }
        for (&y, section) in sections {
            if !present.get(version.light_index(y)) {
                continue;
            }
            if let Some(data) = self.get(section) {
                buffer.write_byte_array(data);
            }
        }
    }
}
