//! Permission Definitions
//!
//! 角色固定，权限随角色下发到 JWT：
//! - teller 发券
//! - barman / waiter 点单、撤单
//! - admin 拥有全部权限 (`all`)

use shared::models::StaffRole;

/// 发行代金券
pub const VOUCHERS_ISSUE: &str = "vouchers:issue";
/// 创建订单并等待客户确认
pub const ORDERS_CREATE: &str = "orders:create";
/// 撤回待确认订单 (清空购物车)
pub const ORDERS_WITHDRAW: &str = "orders:withdraw";
/// 菜单管理 (新增、修改、库存)
pub const MENU_MANAGE: &str = "menu:manage";
/// 报表查看
pub const REPORTS_VIEW: &str = "reports:view";

/// 可配置权限列表
pub const ALL_PERMISSIONS: &[&str] = &[
    VOUCHERS_ISSUE,
    ORDERS_CREATE,
    ORDERS_WITHDRAW,
    MENU_MANAGE,
    REPORTS_VIEW,
];

pub const DEFAULT_TELLER_PERMISSIONS: &[&str] = &[VOUCHERS_ISSUE];

pub const DEFAULT_SERVICE_PERMISSIONS: &[&str] = &[ORDERS_CREATE, ORDERS_WITHDRAW];

pub const DEFAULT_ADMIN_PERMISSIONS: &[&str] = &["all"];

/// Get permissions for a role
pub fn get_default_permissions(role: StaffRole) -> Vec<String> {
    let perms = match role {
        StaffRole::Teller => DEFAULT_TELLER_PERMISSIONS,
        StaffRole::Barman | StaffRole::Waiter => DEFAULT_SERVICE_PERMISSIONS,
        StaffRole::Admin => DEFAULT_ADMIN_PERMISSIONS,
    };
    perms.iter().map(|s| s.to_string()).collect()
}

/// Validate if a permission string is valid
pub fn is_valid_permission(permission: &str) -> bool {
    permission == "all" || ALL_PERMISSIONS.contains(&permission) || permission.ends_with(":*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_permissions() {
        assert_eq!(get_default_permissions(StaffRole::Teller), vec!["vouchers:issue"]);
        assert_eq!(
            get_default_permissions(StaffRole::Waiter),
            get_default_permissions(StaffRole::Barman)
        );
        assert!(get_default_permissions(StaffRole::Barman).contains(&"orders:withdraw".to_string()));
        assert_eq!(get_default_permissions(StaffRole::Admin), vec!["all"]);
    }

    #[test]
    fn test_permission_names_valid() {
        for role in [
            StaffRole::Teller,
            StaffRole::Barman,
            StaffRole::Waiter,
            StaffRole::Admin,
        ] {
            for perm in get_default_permissions(role) {
                assert!(is_valid_permission(&perm), "{perm}");
            }
        }
        assert!(!is_valid_permission("tables:manage"));
    }
}
