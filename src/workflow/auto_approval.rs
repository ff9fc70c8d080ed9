use crate::model::{designation::Designation, leave_request::LeaveRequest};

/// Whether `request` bypasses the approval chain entirely.
///
/// Top-tier requesters are always approved. Everyone else is approved when the
/// request fits inside their designation's threshold, unless the leave type
/// always escalates.
pub fn can_auto_approve(request: &LeaveRequest, designation: &Designation) -> bool {
    if designation.level.is_top_tier() {
        return true;
    }
    !request.leave_type.escalates() && request.days_count <= designation.auto_approve_leave_days
}
