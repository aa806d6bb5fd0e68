//! Bit-exact save/load of a triangle tree.
//!
//! Layout (little-endian, packed):
//! `i32 primitive_count | Triangle[..] | i32 node_count | Node[..] |
//! i32 leaf_total | u32[leaf_total]`.
//!
//! Versioning and endianness tagging are the caller's concern; the loader
//! only rejects headers that cannot describe a tree this crate built.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::{Bvh, BvhNode};
use crate::{error::TreeIoError, triangle::Triangle, TraversalStrategy};

/// Loader bound on `node_count` relative to `primitive_count`; matches the
/// builder's worst-case pool.
const MAX_NODES_PER_PRIMITIVE: i64 = super::SPATIAL_NODE_OVERALLOCATION as i64;
/// Loader bound on `leaf_total` relative to `primitive_count`.
const MAX_REFS_PER_PRIMITIVE: i64 = super::INDEX_OVERALLOCATION as i64;

fn write_count<W: Write>(writer: &mut W, count: usize) -> Result<(), TreeIoError> {
    writer.write_all(&(count as i32).to_le_bytes())?;
    Ok(())
}

fn read_count<R: Read>(reader: &mut R) -> Result<i64, TreeIoError> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(i32::from_le_bytes(bytes) as i64)
}

impl Bvh<Triangle> {
    /// Writes the tree in the packed on-disk layout.
    pub fn save_to<W: Write>(&self, writer: &mut W) -> Result<(), TreeIoError> {
        write_count(writer, self.primitives.len())?;
        writer.write_all(bytemuck::cast_slice(&self.primitives))?;

        write_count(writer, self.nodes.len())?;
        writer.write_all(bytemuck::cast_slice(&self.nodes))?;

        write_count(writer, self.indices.len())?;
        writer.write_all(bytemuck::cast_slice(&self.indices))?;

        Ok(())
    }

    /// Reads a tree previously written by [`Bvh::save_to`].
    pub fn load_from<R: Read>(reader: &mut R) -> Result<Self, TreeIoError> {
        let primitive_count = read_count(reader)?;
        if primitive_count <= 0 {
            return Err(TreeIoError::VersionMismatch {
                field: "primitive_count",
                value: primitive_count,
            });
        }
        let mut primitives = bytemuck::zeroed_vec::<Triangle>(primitive_count as usize);
        reader.read_exact(bytemuck::cast_slice_mut(&mut primitives))?;

        let node_count = read_count(reader)?;
        if node_count < 2 || node_count > primitive_count * MAX_NODES_PER_PRIMITIVE {
            return Err(TreeIoError::VersionMismatch {
                field: "node_count",
                value: node_count,
            });
        }
        let mut nodes = bytemuck::zeroed_vec::<BvhNode>(node_count as usize);
        reader.read_exact(bytemuck::cast_slice_mut(&mut nodes))?;

        let leaf_total = read_count(reader)?;
        if leaf_total < primitive_count || leaf_total > primitive_count * MAX_REFS_PER_PRIMITIVE {
            return Err(TreeIoError::VersionMismatch {
                field: "leaf_total",
                value: leaf_total,
            });
        }
        let mut indices = bytemuck::zeroed_vec::<u32>(leaf_total as usize);
        reader.read_exact(bytemuck::cast_slice_mut(&mut indices))?;

        let uses_spatial_splits = leaf_total > primitive_count;
        Ok(Self {
            primitives,
            nodes,
            indices,
            uses_spatial_splits,
            strategy: TraversalStrategy::Ordered,
        })
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), TreeIoError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.save_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, TreeIoError> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::load_from(&mut reader)
    }
}
