//! Convenience macros for the permission matrix.

/// Build [`PermissionFlags`](crate::permission::PermissionFlags) from the
/// capabilities to grant. The cascade rule is applied, so granting `add`
/// without `visible` yields no access.
///
/// # Examples
///
/// ```rust
/// use permission_matrix::{flags, PermissionFlags};
///
/// let editor = flags![visible, add, change];
/// assert!(editor.change && !editor.delete);
///
/// assert_eq!(flags![], PermissionFlags::NONE);
/// assert_eq!(flags![add], PermissionFlags::NONE);
/// ```
#[macro_export]
macro_rules! flags {
    ($($capability:ident),* $(,)?) => {
        {
            #[allow(unused_mut)]
            let mut flags = $crate::permission::PermissionFlags {
                visible: false,
                add: false,
                change: false,
                delete: false,
            };
            $(
                flags.$capability = true;
            )*
            flags.normalized()
        }
    };
}
