use std::fmt;

use serde::{Deserialize, Serialize};

/// 以名称标识的对象引用。
///
/// 车队模型中所有对象（点、路径、位置、车辆、运输订单、订单序列）都以唯一名称标识，
/// 引用类型只携带名称，按需通过对应的服务解析为对象快照。
macro_rules! object_ref {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            pub fn name(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(name: &str) -> Self {
                Self::new(name)
            }
        }
    };
}

object_ref!(
    /// 点引用
    PointRef
);
object_ref!(
    /// 路径引用
    PathRef
);
object_ref!(
    /// 位置（工位）引用
    LocationRef
);
object_ref!(
    /// 车辆引用
    VehicleRef
);
object_ref!(
    /// 运输订单引用
    OrderRef
);
object_ref!(
    /// 订单序列引用
    SequenceRef
);
