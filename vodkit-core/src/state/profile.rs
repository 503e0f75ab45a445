/// Selected viewer profile of the signed-in account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileState {
    pub profile_id: Option<String>,
    pub selecting_avatar: Option<String>,
}
