/// Declare a typed wrapper over `ClientObject` for a static schema.
macro_rules! entity {
    ($(#[$meta:meta])* $name:ident => $schema:path) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(o365_runtime::ClientObject);

        impl o365_runtime::Entity for $name {
            fn schema() -> &'static o365_runtime::EntitySchema {
                &$schema
            }

            fn from_object(object: o365_runtime::ClientObject) -> Self {
                Self(object)
            }

            fn object(&self) -> &o365_runtime::ClientObject {
                &self.0
            }
        }
    };
}

pub(crate) use entity;
