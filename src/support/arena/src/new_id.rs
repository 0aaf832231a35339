use crate::Id;

/// Marker for key types declared with [`new_id_with_niche!`].
pub trait NewId: Id {}

/// Declares a dedicated arena key type backed by a non-zero integer.
///
/// Handles built from such keys keep the niche, so `Option<Idx<..>>` costs
/// nothing extra.
///
/// ```
/// arena::new_id_with_niche!(WidgetId, u32);
///
/// let mut widgets = arena::Arena::<WidgetId, &str>::new();
/// let gear = widgets.alloc("gear");
/// assert_eq!(widgets[gear], "gear");
/// assert_eq!(
///     core::mem::size_of::<Option<arena::Idx<WidgetId, &str>>>(),
///     core::mem::size_of::<u32>(),
/// );
/// ```
#[macro_export]
macro_rules! new_id_with_niche {
    ($name: ident, $ty: ty) => {
        #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(::core::num::NonZero<$ty>);

        impl $crate::Id for $name {
            const MAX: usize = (<$ty>::MAX - 1) as usize;

            #[inline]
            fn from_usize(idx: usize) -> Self {
                let raw = <$ty>::try_from(idx + 1).expect("arena id overflowed");
                Self(::core::num::NonZero::new(raw).expect("arena id overflowed"))
            }

            #[inline]
            fn into_usize(self) -> usize {
                (self.0.get() - 1) as usize
            }
        }

        impl $crate::NewId for $name {}
    };
}
