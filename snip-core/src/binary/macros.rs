/// Implements [`Serialize`][crate::binary::Serialize] and
/// [`Deserialize`][crate::binary::Deserialize] for a struct by (de)serializing each listed field
/// in order.
#[macro_export]
macro_rules! serializable_structure {
    (type $T:ty { $($field:tt),* $(,)? }) => {
        impl $crate::binary::Serialize for $T {
            fn serialize(
                &self,
                serializer: &mut $crate::binary::Serializer<impl ::std::io::Write>,
            ) -> ::std::result::Result<(), $crate::binary::Error> {
                #[allow(unused_imports)]
                use $crate::binary::ResultContextExt;
                $(
                    $crate::binary::Serialize::serialize(&self.$field, serializer)
                        .context(concat!("cannot serialize field ", stringify!($T), "::", stringify!($field)))?;
                )*
                Ok(())
            }
        }

        impl $crate::binary::Deserialize for $T {
            fn deserialize(
                deserializer: &mut $crate::binary::Deserializer<impl ::std::io::Read>,
            ) -> ::std::result::Result<Self, $crate::binary::Error> {
                #[allow(unused_imports)]
                use $crate::binary::ResultContextExt;
                Ok(Self {
                    $(
                        $field: deserializer
                            .deserialize()
                            .context(concat!("cannot deserialize field ", stringify!($T), "::", stringify!($field)))?,
                    )*
                })
            }
        }
    };
}

/// Makes a `bitflags` type (de)serializable as its underlying integer.
///
/// With `validate`, deserialization rejects unknown bits.
#[macro_export]
macro_rules! serializable_bitflags {
    (type $T:ty; validate) => {
        $crate::serializable_bitflags! { @impl $T, true }
    };
    ($T:ty) => {
        $crate::serializable_bitflags! { @impl $T, false }
    };
    (@impl $T:ty, $validate:expr) => {
        impl $crate::binary::Serialize for $T {
            fn serialize(
                &self,
                serializer: &mut $crate::binary::Serializer<impl ::std::io::Write>,
            ) -> ::std::result::Result<(), $crate::binary::Error> {
                $crate::binary::Serialize::serialize(&self.bits(), serializer)
            }
        }

        impl $crate::binary::Deserialize for $T {
            fn deserialize(
                deserializer: &mut $crate::binary::Deserializer<impl ::std::io::Read>,
            ) -> ::std::result::Result<Self, $crate::binary::Error> {
                let bits = deserializer.deserialize()?;
                if $validate {
                    Self::from_bits(bits).ok_or_else(|| {
                        $crate::binary::ErrorKind::Deserialize
                            .make(format!("invalid {} bits {bits:#x}", stringify!($T)))
                    })
                } else {
                    Ok(Self::from_bits_retain(bits))
                }
            }
        }
    };
}
