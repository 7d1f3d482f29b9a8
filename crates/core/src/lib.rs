#![forbid(unsafe_code)]

pub mod ids {
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct TodoId(i64);

    impl TodoId {
        pub fn as_i64(self) -> i64 {
            self.0
        }

        pub fn try_new(value: i64) -> Result<Self, TodoIdError> {
            if value <= 0 {
                return Err(TodoIdError::NotPositive);
            }
            Ok(Self(value))
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum TodoIdError {
        NotPositive,
    }

    impl TodoIdError {
        pub fn message(&self) -> &'static str {
            match self {
                Self::NotPositive => "todo id must be a positive integer",
            }
        }
    }

    impl Serialize for TodoId {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_i64(self.0)
        }
    }

    impl<'de> Deserialize<'de> for TodoId {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = i64::deserialize(deserializer)?;
            TodoId::try_new(raw).map_err(|err| de::Error::custom(err.message()))
        }
    }
}

pub mod timestamp {
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
    use std::fmt;
    use time::PrimitiveDateTime;
    use time::format_description::FormatItem;
    use time::macros::format_description;

    // The form SQLite's CURRENT_TIMESTAMP produces; always UTC.
    const SQL_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct UtcTimestamp(PrimitiveDateTime);

    impl UtcTimestamp {
        pub fn parse(value: &str) -> Result<Self, TimestampError> {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(TimestampError::Empty);
            }
            let parsed = PrimitiveDateTime::parse(trimmed, SQL_FORMAT)
                .map_err(|_| TimestampError::InvalidFormat)?;
            Ok(Self(parsed))
        }
    }

    impl fmt::Display for UtcTimestamp {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let rendered = self.0.format(SQL_FORMAT).map_err(|_| fmt::Error)?;
            f.write_str(&rendered)
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum TimestampError {
        Empty,
        InvalidFormat,
    }

    impl TimestampError {
        pub fn message(&self) -> &'static str {
            match self {
                Self::Empty => "timestamp must not be empty",
                Self::InvalidFormat => "timestamp must look like YYYY-MM-DD HH:MM:SS",
            }
        }
    }

    impl Serialize for UtcTimestamp {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for UtcTimestamp {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = String::deserialize(deserializer)?;
            UtcTimestamp::parse(&raw).map_err(|err| de::Error::custom(err.message()))
        }
    }
}

pub mod model {
    use crate::ids::TodoId;
    use crate::timestamp::UtcTimestamp;
    use serde::Serialize;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct TodoItem {
        id: TodoId,
        body: String,
        completed: bool,
        created_at: UtcTimestamp,
        updated_at: UtcTimestamp,
    }

    impl TodoItem {
        pub fn try_new(
            id: TodoId,
            body: String,
            completed: bool,
            created_at: UtcTimestamp,
            updated_at: UtcTimestamp,
        ) -> Result<Self, TodoItemError> {
            if updated_at < created_at {
                return Err(TodoItemError::UpdatedBeforeCreated);
            }
            Ok(Self {
                id,
                body,
                completed,
                created_at,
                updated_at,
            })
        }

        pub fn id(&self) -> TodoId {
            self.id
        }

        pub fn body(&self) -> &str {
            &self.body
        }

        pub fn completed(&self) -> bool {
            self.completed
        }

        pub fn created_at(&self) -> UtcTimestamp {
            self.created_at
        }

        pub fn updated_at(&self) -> UtcTimestamp {
            self.updated_at
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum TodoItemError {
        UpdatedBeforeCreated,
    }

    impl TodoItemError {
        pub fn message(&self) -> &'static str {
            match self {
                Self::UpdatedBeforeCreated => "updated_at must not precede created_at",
            }
        }
    }
}
