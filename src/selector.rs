use crate::{
    error::{Error, Result},
    AddressFamily, NetworkDefaultGateway,
};

/// A route joined with one address assigned to the route's interface
pub(crate) trait Candidate {
    /// Address family of the assigned address, if recognized
    fn family(&self) -> Option<AddressFamily>;

    /// Whether the OS reports the interface or address as usable
    fn is_usable(&self) -> bool;

    /// Routing cost; lower wins
    fn metric(&self) -> u32;

    /// Map the platform's field names onto the common result
    fn into_gateway(self, family: AddressFamily) -> Result<NetworkDefaultGateway>;
}

/// Pick the default interface among `candidates` for `family`.
///
/// Candidates of the wrong family are dropped first, then unusable ones, and
/// the lowest metric wins. Equal metrics keep the earlier candidate.
pub(crate) fn select<C: Candidate>(candidates: Vec<C>, family: AddressFamily) -> Result<C> {
    let in_family: Vec<C> = candidates
        .into_iter()
        .filter(|candidate| candidate.family() == Some(family))
        .collect();
    if in_family.is_empty() {
        return Err(Error::DefaultInterfaceNotFound);
    }

    in_family
        .into_iter()
        .filter(|candidate| candidate.is_usable())
        .fold(None, |best: Option<C>, next| match best {
            Some(best) if best.metric() <= next.metric() => Some(best),
            _ => Some(next),
        })
        .ok_or(Error::NoAvailableNetwork)
}

/// [`select`] followed by the mapping to the public result
pub(crate) fn select_gateway<C: Candidate>(
    candidates: Vec<C>,
    family: AddressFamily,
) -> Result<NetworkDefaultGateway> {
    let winner = select(candidates, family)?;
    let gateway = winner.into_gateway(family)?;
    tracing::debug!(%family, %gateway, "selected default interface");
    Ok(gateway)
}
