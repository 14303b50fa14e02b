//! Filesystem collaborator: traversal and directory operations.

pub mod ops;
pub mod walker;

pub use ops::{
    assert_directory, clear_dir, copy_all, copy_changed_since, create_dir,
    list_immediate_children, remove_dir_recursive, set_owner_only, CopyStats,
};
