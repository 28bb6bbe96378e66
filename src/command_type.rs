//! Monitorable command types.

/// Executable command types that can be monitored by the driver.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum CommandType {
    Aggregate,
    BulkWrite,
    Count,
    DeleteMany,
    DeleteOne,
    Distinct,
    Find,
    FindOneAndDelete,
    FindOneAndReplace,
    FindOneAndUpdate,
    GetMore,
    InsertMany,
    InsertOne,
    KillCursors,
    ReplaceOne,
    UpdateMany,
    UpdateOne,
}

impl CommandType {
    pub fn to_str(&self) -> &str {
        match *self {
            CommandType::Aggregate => "aggregate",
            CommandType::BulkWrite => "bulk_write",
            CommandType::Count => "count",
            CommandType::DeleteMany => "delete_many",
            CommandType::DeleteOne => "delete_one",
            CommandType::Distinct => "distinct",
            CommandType::Find => "find",
            CommandType::FindOneAndDelete => "find_one_and_delete",
            CommandType::FindOneAndReplace => "find_one_and_replace",
            CommandType::FindOneAndUpdate => "find_one_and_update",
            CommandType::GetMore => "get_more",
            CommandType::InsertMany => "insert_many",
            CommandType::InsertOne => "insert_one",
            CommandType::KillCursors => "kill_cursors",
            CommandType::ReplaceOne => "replace_one",
            CommandType::UpdateMany => "update_many",
            CommandType::UpdateOne => "update_one",
        }
    }

    /// Write commands always go to a primary-capable node.
    pub fn is_write_command(&self) -> bool {
        match *self {
            CommandType::BulkWrite |
            CommandType::DeleteMany |
            CommandType::DeleteOne |
            CommandType::FindOneAndDelete |
            CommandType::FindOneAndReplace |
            CommandType::FindOneAndUpdate |
            CommandType::InsertMany |
            CommandType::InsertOne |
            CommandType::ReplaceOne |
            CommandType::UpdateMany |
            CommandType::UpdateOne => true,
            CommandType::Aggregate |
            CommandType::Count |
            CommandType::Distinct |
            CommandType::Find |
            CommandType::GetMore |
            CommandType::KillCursors => false,
        }
    }
}
