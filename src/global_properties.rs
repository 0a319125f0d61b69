//! Run-wide, read-only values such as the model parameters.
//!
//! A global property is set once, usually right after it is read from a JSON file, and
//! validated at that moment. A property may only be set once per `Context`.
use std::any::{Any, TypeId};
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::AbmError;
use crate::hashing::HashMap;
use crate::log::trace;

/// Defines a global property type.
///
/// The optional third argument is a validator `fn(&$value) -> Result<(), AbmError>`
/// that runs whenever the property is set.
#[macro_export]
macro_rules! define_global_property {
    ($global_property:ident, $value:ty, $validate:expr) => {
        #[derive(Copy, Clone)]
        pub struct $global_property;

        impl $crate::global_properties::GlobalProperty for $global_property {
            type Value = $value;

            fn validate(value: &$value) -> Result<(), $crate::error::AbmError> {
                $validate(value)
            }
        }
    };
    ($global_property:ident, $value:ty) => {
        $crate::define_global_property!($global_property, $value, |_| Ok(()));
    };
}
pub use define_global_property;

pub trait GlobalProperty: Any {
    type Value: Any;

    /// # Errors
    ///
    /// Returns an `AbmError::ConfigError` describing why `value` is unusable.
    fn validate(value: &Self::Value) -> Result<(), AbmError>;
}

struct GlobalPropertiesDataContainer {
    values: HashMap<TypeId, Box<dyn Any>>,
}

define_data_plugin!(
    GlobalPropertiesPlugin,
    GlobalPropertiesDataContainer,
    GlobalPropertiesDataContainer {
        values: HashMap::default(),
    }
);

pub trait ContextGlobalPropertiesExt {
    /// Validates and stores `value`.
    ///
    /// # Errors
    ///
    /// Fails if the value does not validate or the property was already set.
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        property: T,
        value: T::Value,
    ) -> Result<(), AbmError>;

    /// Returns the value of the property or `None` if it was never set.
    fn get_global_property_value<T: GlobalProperty>(&self, property: T) -> Option<&T::Value>;

    /// Reads and deserializes a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `AbmError::IoError` if the file cannot be read and `AbmError::JsonError`
    /// if it does not deserialize into `T`.
    fn load_parameters_from_json<T: DeserializeOwned>(&self, file_path: &Path)
        -> Result<T, AbmError>;
}

impl ContextGlobalPropertiesExt for Context {
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        _property: T,
        value: T::Value,
    ) -> Result<(), AbmError> {
        T::validate(&value)?;
        let container = self.get_data_container_mut(GlobalPropertiesPlugin);
        if container.values.contains_key(&TypeId::of::<T>()) {
            return Err(AbmError::ConfigError(format!(
                "global property {} is already set",
                std::any::type_name::<T>()
            )));
        }
        container.values.insert(TypeId::of::<T>(), Box::new(value));
        Ok(())
    }

    fn get_global_property_value<T: GlobalProperty>(&self, _property: T) -> Option<&T::Value> {
        self.get_data_container(GlobalPropertiesPlugin)?
            .values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T::Value>())
    }

    fn load_parameters_from_json<T: DeserializeOwned>(
        &self,
        file_path: &Path,
    ) -> Result<T, AbmError> {
        trace!("loading parameters from {}", file_path.display());
        let contents = fs::read_to_string(file_path)?;
        let parameters = serde_json::from_str(&contents)?;
        Ok(parameters)
    }
}
